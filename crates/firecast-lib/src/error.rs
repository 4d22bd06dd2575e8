//! Error taxonomy for the prediction pipeline

use crate::models::FeatureId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by artifact loading and prediction.
///
/// None of these are recovered locally. Artifact failures are permanent for
/// the lifetime of a process, so the type is `Clone` and the store hands the
/// same cached error to every caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Artifact missing: {} ({reason})", .path.display())]
    ArtifactMissing { path: PathBuf, reason: String },

    #[error("Artifact corrupt: {}: {reason}", .path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("Normalizer fitted for {bound} applied to {requested}")]
    FeatureMismatch {
        bound: FeatureId,
        requested: FeatureId,
    },

    #[error("Degenerate scale for {feature}: fitted min and max are both {value}")]
    DegenerateScale { feature: FeatureId, value: f64 },

    #[error("Classifier invocation failed: {0}")]
    ClassifierInvocationFailure(String),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub(crate) fn missing(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::ArtifactMissing {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::ArtifactCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Stable snake_case name used in logs, metrics labels and API bodies
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::ArtifactMissing { .. } => "artifact_missing",
            PipelineError::ArtifactCorrupt { .. } => "artifact_corrupt",
            PipelineError::FeatureMismatch { .. } => "feature_mismatch",
            PipelineError::DegenerateScale { .. } => "degenerate_scale",
            PipelineError::ClassifierInvocationFailure(_) => "classifier_invocation_failure",
        }
    }

    /// True when the artifacts could not be loaded and predictions must stay disabled
    pub fn is_artifact_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::ArtifactMissing { .. } | PipelineError::ArtifactCorrupt { .. }
        )
    }
}

//! Artifact loading
//!
//! The store reads the trained classifier and the fitted normalizers once
//! and keeps them for the lifetime of the process. Loading happens behind a
//! one-time barrier, so concurrent first callers trigger exactly one read and
//! every later call returns the same artifacts (or the same error).

mod layout;

pub use layout::{parse_normalizers, NormalizerLayout};

use crate::error::{PipelineError, PipelineResult};
use crate::models::FeatureId;
use crate::predictor::{
    Classifier, ClassifierFormat, ClassifierVariant, ForestClassifier, NormalizerSet,
    OnnxClassifier,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

/// Maximum artifact size accepted by default (64 MiB)
pub const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 64 * 1024 * 1024;

/// Where the artifacts live and how to read them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Serialized classifier
    #[serde(default = "default_classifier_path")]
    pub classifier_path: PathBuf,

    /// Classifier format, inferred from the file extension when unset
    #[serde(default)]
    pub classifier_format: Option<ClassifierFormat>,

    /// Serialized normalizers
    #[serde(default = "default_normalizers_path")]
    pub normalizers_path: PathBuf,

    #[serde(default)]
    pub normalizer_layout: NormalizerLayout,

    /// Expected hex SHA-256 of the classifier file
    #[serde(default)]
    pub classifier_sha256: Option<String>,

    /// Expected hex SHA-256 of the normalizer file
    #[serde(default)]
    pub normalizers_sha256: Option<String>,

    #[serde(default = "default_max_artifact_bytes")]
    pub max_artifact_bytes: u64,
}

fn default_classifier_path() -> PathBuf {
    PathBuf::from("artifacts/random_forest_model.json")
}

fn default_normalizers_path() -> PathBuf {
    PathBuf::from("artifacts/minmax_scalers.json")
}

fn default_max_artifact_bytes() -> u64 {
    DEFAULT_MAX_ARTIFACT_BYTES
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            classifier_path: default_classifier_path(),
            classifier_format: None,
            normalizers_path: default_normalizers_path(),
            normalizer_layout: NormalizerLayout::default(),
            classifier_sha256: None,
            normalizers_sha256: None,
            max_artifact_bytes: default_max_artifact_bytes(),
        }
    }
}

impl ArtifactConfig {
    pub fn new(classifier_path: impl Into<PathBuf>, normalizers_path: impl Into<PathBuf>) -> Self {
        Self {
            classifier_path: classifier_path.into(),
            normalizers_path: normalizers_path.into(),
            ..Self::default()
        }
    }

    pub fn with_layout(mut self, layout: NormalizerLayout) -> Self {
        self.normalizer_layout = layout;
        self
    }

    pub fn with_format(mut self, format: ClassifierFormat) -> Self {
        self.classifier_format = Some(format);
        self
    }

    /// Configured format, or the one implied by the classifier file extension
    pub fn resolved_format(&self) -> PipelineResult<ClassifierFormat> {
        if let Some(format) = self.classifier_format {
            return Ok(format);
        }
        let ext = self
            .classifier_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Ok(ClassifierFormat::Forest),
            Some("onnx") => Ok(ClassifierFormat::Onnx),
            _ => Err(PipelineError::corrupt(
                &self.classifier_path,
                "cannot infer classifier format from extension; set classifier_format",
            )),
        }
    }
}

/// Fitted range of one normalizer, for reporting
#[derive(Debug, Clone, Serialize)]
pub struct FeatureRange {
    pub feature: FeatureId,
    pub min: f64,
    pub max: f64,
}

/// Description of what was loaded
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub classifier_path: PathBuf,
    pub classifier_format: ClassifierFormat,
    pub classifier_variant: ClassifierVariant,
    pub classifier_sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<i64>>,
    pub normalizers_path: PathBuf,
    pub normalizer_layout: NormalizerLayout,
    pub normalizers: Vec<FeatureRange>,
}

/// Classifier and normalizers, read-only once loaded
#[derive(Debug)]
pub struct LoadedArtifacts {
    classifier: Classifier,
    normalizers: NormalizerSet,
    summary: ArtifactSummary,
}

impl LoadedArtifacts {
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn normalizers(&self) -> &NormalizerSet {
        &self.normalizers
    }

    pub fn summary(&self) -> &ArtifactSummary {
        &self.summary
    }
}

/// Loads artifacts once and hands out the shared result
#[derive(Debug)]
pub struct ArtifactStore {
    config: ArtifactConfig,
    loaded: OnceLock<PipelineResult<Arc<LoadedArtifacts>>>,
}

impl ArtifactStore {
    pub fn new(config: ArtifactConfig) -> Self {
        Self {
            config,
            loaded: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &ArtifactConfig {
        &self.config
    }

    /// True once artifacts have been loaded successfully
    pub fn is_loaded(&self) -> bool {
        matches!(self.loaded.get(), Some(Ok(_)))
    }

    /// Load on first call; afterwards return the cached artifacts or error
    pub fn load(&self) -> PipelineResult<Arc<LoadedArtifacts>> {
        self.loaded
            .get_or_init(|| {
                let result = load_artifacts(&self.config).map(Arc::new);
                match &result {
                    Ok(artifacts) => {
                        let summary = artifacts.summary();
                        info!(
                            classifier = %summary.classifier_path.display(),
                            format = %summary.classifier_format,
                            variant = %summary.classifier_variant,
                            normalizers = %summary.normalizers_path.display(),
                            layout = %summary.normalizer_layout,
                            "Artifacts loaded"
                        );
                    }
                    Err(e) => {
                        error!(error = %e, kind = e.kind(), "Artifact loading failed");
                    }
                }
                result
            })
            .clone()
    }
}

fn load_artifacts(config: &ArtifactConfig) -> PipelineResult<LoadedArtifacts> {
    // Classifier first: a missing model fails before any scaler is touched
    let classifier_bytes = read_artifact(
        &config.classifier_path,
        config.max_artifact_bytes,
        config.classifier_sha256.as_deref(),
    )?;
    let format = config.resolved_format()?;
    let classifier = match format {
        ClassifierFormat::Forest => {
            ForestClassifier::from_json(&classifier_bytes, &config.classifier_path)?.into_classifier()
        }
        ClassifierFormat::Onnx => {
            OnnxClassifier::from_bytes(&classifier_bytes, &config.classifier_path)?.into_classifier()
        }
    };

    let normalizer_bytes = read_artifact(
        &config.normalizers_path,
        config.max_artifact_bytes,
        config.normalizers_sha256.as_deref(),
    )?;
    let normalizers = parse_normalizers(
        &normalizer_bytes,
        config.normalizer_layout,
        &config.normalizers_path,
    )?;

    let classes = match &classifier {
        Classifier::Probabilistic(c) => Some(c.classes().to_vec()),
        Classifier::ClassWise(_) => None,
    };
    let summary = ArtifactSummary {
        classifier_path: config.classifier_path.clone(),
        classifier_format: classifier.format(),
        classifier_variant: classifier.variant(),
        classifier_sha256: compute_checksum(&classifier_bytes),
        classes,
        normalizers_path: config.normalizers_path.clone(),
        normalizer_layout: config.normalizer_layout,
        normalizers: normalizers
            .iter()
            .map(|n| FeatureRange {
                feature: n.feature(),
                min: n.min(),
                max: n.max(),
            })
            .collect(),
    };

    Ok(LoadedArtifacts {
        classifier,
        normalizers,
        summary,
    })
}

/// Read an artifact file, enforcing size and optional checksum
fn read_artifact(path: &Path, max_bytes: u64, expected_sha256: Option<&str>) -> PipelineResult<Vec<u8>> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PipelineError::missing(path, "file not found"),
        _ => PipelineError::missing(path, format!("unreadable: {}", e)),
    })?;
    if !metadata.is_file() {
        return Err(PipelineError::missing(path, "not a regular file"));
    }
    if metadata.len() > max_bytes {
        return Err(PipelineError::corrupt(
            path,
            format!("size {} exceeds maximum {}", metadata.len(), max_bytes),
        ));
    }

    let bytes = fs::read(path).map_err(|e| PipelineError::missing(path, format!("unreadable: {}", e)))?;

    if let Some(expected) = expected_sha256 {
        let computed = compute_checksum(&bytes);
        if !computed.eq_ignore_ascii_case(expected.trim()) {
            return Err(PipelineError::corrupt(
                path,
                format!("checksum mismatch: expected {}, got {}", expected, computed),
            ));
        }
    }

    Ok(bytes)
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

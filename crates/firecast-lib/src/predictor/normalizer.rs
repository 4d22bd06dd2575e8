//! Fitted min-max feature normalizers
//!
//! Each normalizer is bound to one feature identity at load time. Applying it
//! to any other feature is rejected instead of silently producing a scaled
//! value on the wrong axis.

use super::features::{Feature, Scaled};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{FeatureId, NUM_FEATURES};
use serde::Serialize;

/// Min-max transform fitted on one training column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureNormalizer {
    feature: FeatureId,
    min: f64,
    max: f64,
}

impl FeatureNormalizer {
    pub fn new(feature: FeatureId, min: f64, max: f64) -> Self {
        Self { feature, min, max }
    }

    /// Feature identity this normalizer was fitted on
    pub fn feature(&self) -> FeatureId {
        self.feature
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    /// Scale `raw` into the fitted range.
    ///
    /// Values outside `[min, max]` extrapolate outside `[0, 1]`; the training
    /// scaler never clamped either.
    pub fn normalize(&self, feature: FeatureId, raw: f64) -> PipelineResult<f64> {
        if feature != self.feature {
            return Err(PipelineError::FeatureMismatch {
                bound: self.feature,
                requested: feature,
            });
        }
        if self.is_degenerate() {
            return Err(PipelineError::DegenerateScale {
                feature: self.feature,
                value: self.min,
            });
        }
        Ok((raw - self.min) / (self.max - self.min))
    }
}

/// One fitted normalizer per feature, keyed by identity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizerSet {
    normalizers: [FeatureNormalizer; NUM_FEATURES],
}

impl NormalizerSet {
    /// Build the set from normalizers in any order.
    ///
    /// Fails with a description when a feature is missing or bound twice.
    pub fn from_normalizers(
        normalizers: impl IntoIterator<Item = FeatureNormalizer>,
    ) -> Result<Self, String> {
        let mut slots: [Option<FeatureNormalizer>; NUM_FEATURES] = [None; NUM_FEATURES];
        for normalizer in normalizers {
            let slot = &mut slots[normalizer.feature().index()];
            if slot.is_some() {
                return Err(format!("duplicate normalizer for {}", normalizer.feature()));
            }
            *slot = Some(normalizer);
        }

        let mut out = Vec::with_capacity(NUM_FEATURES);
        for (feature, slot) in FeatureId::ALL.iter().zip(slots) {
            match slot {
                Some(normalizer) => out.push(normalizer),
                None => return Err(format!("no normalizer for {}", feature)),
            }
        }
        Ok(Self {
            normalizers: [out[0], out[1], out[2]],
        })
    }

    /// Normalizer bound to `feature`
    pub fn get(&self, feature: FeatureId) -> &FeatureNormalizer {
        &self.normalizers[feature.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureNormalizer> {
        self.normalizers.iter()
    }

    /// Scale one raw value with the normalizer fitted for `feature`
    pub fn normalize(&self, feature: FeatureId, raw: f64) -> PipelineResult<f64> {
        self.get(feature).normalize(feature, raw)
    }

    /// Scale one raw value and tag it with its feature type for assembly
    pub fn scale<F: Feature>(&self, raw: f64) -> PipelineResult<Scaled<F>> {
        self.normalize(F::ID, raw).map(Scaled::new)
    }
}

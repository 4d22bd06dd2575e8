//! Prediction orchestration
//!
//! Raw observation → per-feature normalization → assembled vector → one
//! classifier call → labeled result. The service holds no mutable state
//! besides counters, so `predict` can be called concurrently.

use super::features::{FeatureAssembler, Humidity, Temperature, Windspeed};
use crate::artifacts::{ArtifactStore, LoadedArtifacts};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{
    ClassProbabilities, FireLabel, LabeledPrediction, PredictionRequest, PredictionResult,
    RawFeatures,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Prediction latency above which a warning is logged (5ms target)
pub const SLOW_PREDICTION_MS: u128 = 5;

/// Counters describing service activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServiceStats {
    pub total_predictions: u64,
    pub fire_predictions: u64,
    pub failed_predictions: u64,
    pub slow_predictions: u64,
}

/// Runs the full inference pipeline against a shared artifact store
pub struct PredictionService {
    store: Arc<ArtifactStore>,
    total_predictions: AtomicU64,
    fire_predictions: AtomicU64,
    failed_predictions: AtomicU64,
    slow_predictions: AtomicU64,
}

impl PredictionService {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self {
            store,
            total_predictions: AtomicU64::new(0),
            fire_predictions: AtomicU64::new(0),
            failed_predictions: AtomicU64::new(0),
            slow_predictions: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Classify one raw observation
    ///
    /// Latency covers scaling and classification only; the first call's
    /// artifact load is not counted against the target.
    pub fn predict(&self, raw: &RawFeatures) -> PipelineResult<PredictionResult> {
        let artifacts = match self.store.load() {
            Ok(artifacts) => artifacts,
            Err(e) => {
                self.record_failure(&e);
                return Err(e);
            }
        };

        let start = Instant::now();
        let result = Self::run_pipeline(&artifacts, raw);
        let elapsed = start.elapsed();

        match &result {
            Ok(prediction) => {
                self.total_predictions.fetch_add(1, Ordering::Relaxed);
                if prediction.label == FireLabel::Fire {
                    self.fire_predictions.fetch_add(1, Ordering::Relaxed);
                }
                if elapsed.as_millis() > SLOW_PREDICTION_MS {
                    self.slow_predictions.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        elapsed_ms = elapsed.as_millis(),
                        "Prediction exceeded {}ms target", SLOW_PREDICTION_MS
                    );
                }
                debug!(
                    temperature = raw.temperature,
                    humidity = raw.humidity,
                    windspeed = raw.windspeed,
                    label = prediction.label.as_str(),
                    confidence = ?prediction.confidence(),
                    elapsed_us = elapsed.as_micros(),
                    "Prediction completed"
                );
            }
            Err(e) => self.record_failure(e),
        }

        result
    }

    fn record_failure(&self, e: &PipelineError) {
        self.failed_predictions.fetch_add(1, Ordering::Relaxed);
        debug!(error = %e, kind = e.kind(), "Prediction failed");
    }

    fn run_pipeline(artifacts: &LoadedArtifacts, raw: &RawFeatures) -> PipelineResult<PredictionResult> {
        let normalizers = artifacts.normalizers();
        let vector = FeatureAssembler::assemble(
            normalizers.scale::<Temperature>(raw.temperature)?,
            normalizers.scale::<Humidity>(raw.humidity)?,
            normalizers.scale::<Windspeed>(raw.windspeed)?,
        );

        let (class, distribution) = artifacts.classifier().classify(&vector)?;
        let label = FireLabel::from_class(class).ok_or_else(|| {
            PipelineError::ClassifierInvocationFailure(format!(
                "classifier returned unknown class {}",
                class
            ))
        })?;

        let probabilities = distribution.map(into_probabilities).transpose()?;

        Ok(PredictionResult {
            label,
            probabilities,
        })
    }

    /// Classify a collector record and attach its map placement
    pub fn predict_labeled(&self, request: &PredictionRequest) -> PipelineResult<LabeledPrediction> {
        let result = self.predict(&request.features)?;
        Ok(LabeledPrediction {
            features: request.features,
            result,
            location: request.location(),
            predicted_at: chrono::Utc::now().timestamp(),
        })
    }

    /// Classify several observations, stopping at the first failure
    pub fn predict_batch(&self, inputs: &[RawFeatures]) -> PipelineResult<Vec<PredictionResult>> {
        inputs.iter().map(|raw| self.predict(raw)).collect()
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            total_predictions: self.total_predictions.load(Ordering::Relaxed),
            fire_predictions: self.fire_predictions.load(Ordering::Relaxed),
            failed_predictions: self.failed_predictions.load(Ordering::Relaxed),
            slow_predictions: self.slow_predictions.load(Ordering::Relaxed),
        }
    }
}

/// Map a class-keyed distribution onto the two fire labels
fn into_probabilities(pairs: Vec<(i64, f32)>) -> PipelineResult<ClassProbabilities> {
    let mut no_fire = None;
    let mut fire = None;
    for (class, p) in pairs {
        match FireLabel::from_class(class) {
            Some(FireLabel::NoFire) => no_fire = Some(p),
            Some(FireLabel::Fire) => fire = Some(p),
            None => {
                return Err(PipelineError::ClassifierInvocationFailure(format!(
                    "distribution covers unknown class {}",
                    class
                )))
            }
        }
    }
    match (no_fire, fire) {
        (Some(no_fire), Some(fire)) => Ok(ClassProbabilities { no_fire, fire }),
        _ => Err(PipelineError::ClassifierInvocationFailure(
            "distribution does not cover both classes".to_string(),
        )),
    }
}

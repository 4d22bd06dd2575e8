//! Observability infrastructure for the fire predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, predictions by label, errors by kind, classifier info)
//! - Structured JSON logging with tracing

use crate::artifacts::ArtifactSummary;
use crate::error::PipelineError;
use crate::models::{FireLabel, LabeledPrediction};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, register_int_gauge,
    GaugeVec, Histogram, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PipelineMetricsInner> = OnceLock::new();

struct PipelineMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    artifacts_loaded: IntGauge,
    classifier_info: GaugeVec,
}

impl PipelineMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "fire_predictor_prediction_latency_seconds",
                "Time spent normalizing, assembling and classifying one observation",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "fire_predictor_predictions_total",
                "Predictions generated, by label",
                &["label"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "fire_predictor_prediction_errors_total",
                "Failed predictions, by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            artifacts_loaded: register_int_gauge!(
                "fire_predictor_artifacts_loaded",
                "1 when the classifier and normalizers are loaded"
            )
            .expect("Failed to register artifacts_loaded"),

            classifier_info: register_gauge_vec!(
                "fire_predictor_classifier_info",
                "Information about the loaded classifier",
                &["format", "variant"]
            )
            .expect("Failed to register classifier_info"),
        }
    }
}

/// Lightweight handle to the global metrics; clones share the same metrics
#[derive(Clone)]
pub struct PipelineMetrics {
    _private: (),
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PipelineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PipelineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, label: FireLabel) {
        self.inner()
            .predictions_total
            .with_label_values(&[label.as_str()])
            .inc();
    }

    pub fn inc_prediction_errors(&self, error: &PipelineError) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[error.kind()])
            .inc();
    }

    /// Record a successful artifact load
    pub fn set_artifacts_loaded(&self, summary: &ArtifactSummary) {
        self.inner().artifacts_loaded.set(1);
        self.inner().classifier_info.reset();
        self.inner()
            .classifier_info
            .with_label_values(&[
                &summary.classifier_format.to_string(),
                &summary.classifier_variant.to_string(),
            ])
            .set(1.0);
    }

    pub fn set_artifacts_unavailable(&self) {
        self.inner().artifacts_loaded.set(0);
        self.inner().classifier_info.reset();
    }
}

/// Structured logger for predictor events
///
/// Emits event-tagged records so log pipelines can filter on `event`.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "agent_started",
            instance = %self.instance,
            agent_version = %version,
            "Fire predictor started"
        );
    }

    pub fn log_artifacts_loaded(&self, summary: &ArtifactSummary) {
        info!(
            event = "artifacts_loaded",
            instance = %self.instance,
            classifier = %summary.classifier_path.display(),
            classifier_format = %summary.classifier_format,
            classifier_variant = %summary.classifier_variant,
            classifier_sha256 = %summary.classifier_sha256,
            normalizers = %summary.normalizers_path.display(),
            normalizer_layout = %summary.normalizer_layout,
            "Classifier and normalizers ready"
        );
    }

    pub fn log_artifact_load_failed(&self, error: &PipelineError) {
        error!(
            event = "artifact_load_failed",
            instance = %self.instance,
            kind = error.kind(),
            error = %error,
            "Artifacts unavailable, predictions disabled"
        );
    }

    pub fn log_prediction(&self, prediction: &LabeledPrediction) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            temperature = prediction.features.temperature,
            humidity = prediction.features.humidity,
            windspeed = prediction.features.windspeed,
            label = prediction.result.label.as_str(),
            confidence = ?prediction.result.confidence(),
            latitude = ?prediction.location.map(|l| l.latitude),
            longitude = ?prediction.location.map(|l| l.longitude),
            "Generated fire prediction"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Fire predictor shutting down"
        );
    }
}

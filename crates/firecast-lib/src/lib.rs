//! Fire occurrence prediction library
//!
//! This crate provides the core functionality for:
//! - Loading a trained classifier and fitted feature normalizers
//! - Normalizing and assembling weather features in training order
//! - Classifying observations as fire / no fire
//! - Health checks and observability

pub mod artifacts;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;

pub use artifacts::{ArtifactConfig, ArtifactStore, ArtifactSummary, LoadedArtifacts, NormalizerLayout};
pub use error::{PipelineError, PipelineResult};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{PipelineMetrics, StructuredLogger};
pub use predictor::{ClassifierFormat, ClassifierVariant, PredictionService, ServiceStats};

//! CLI command implementations

pub mod inspect;
pub mod predict;

use firecast_lib::{ArtifactConfig, ArtifactStore, PredictionService};
use std::sync::Arc;

/// Build a service whose artifacts load on first use
pub fn open_service(config: ArtifactConfig) -> PredictionService {
    PredictionService::new(Arc::new(ArtifactStore::new(config)))
}

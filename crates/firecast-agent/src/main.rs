//! Fire predictor agent
//!
//! Loads the classifier and normalizers once at startup and serves
//! predictions to the input collector and map overlay over HTTP.

use anyhow::Result;
use firecast_agent::{api, config::AgentConfig};
use firecast_lib::{
    health::{components, HealthRegistry},
    ArtifactStore, PipelineMetrics, PredictionService, StructuredLogger,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting firecast-agent");

    let config = AgentConfig::load()?;
    info!(
        instance = %config.instance_name,
        classifier = %config.artifacts.classifier_path.display(),
        normalizers = %config.artifacts.normalizers_path.display(),
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::ARTIFACTS).await;
    health_registry.register(components::PREDICTOR).await;

    let metrics = PipelineMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(AGENT_VERSION);

    // Load eagerly so readiness reflects the artifacts; a failure keeps
    // the server up but every prediction answers 503.
    let store = Arc::new(ArtifactStore::new(config.artifacts.clone()));
    match store.load() {
        Ok(artifacts) => {
            metrics.set_artifacts_loaded(artifacts.summary());
            logger.log_artifacts_loaded(artifacts.summary());
            health_registry.record_artifact_load(Ok(())).await;
        }
        Err(e) => {
            metrics.set_artifacts_unavailable();
            logger.log_artifact_load_failed(&e);
            health_registry.record_artifact_load(Err(&e)).await;
        }
    }

    let service = Arc::new(PredictionService::new(store));
    let app_state = Arc::new(api::AppState::new(
        service,
        health_registry,
        metrics,
        logger.clone(),
    ));

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
                Ok(Ok(())) => {}
            }
            logger.log_shutdown("API server stopped");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}

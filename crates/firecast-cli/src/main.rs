//! Fire Occurrence Predictor CLI
//!
//! Runs the prediction pipeline locally: the fixed batch examples, a single
//! observation, or an inspection of the loaded artifacts.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{inspect, predict};
use firecast_lib::{PredictionRequest, RawFeatures};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Fire Occurrence Predictor CLI
#[derive(Parser)]
#[command(name = "firecast")]
#[command(author, version, about = "CLI for Fire Occurrence Predictor", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub artifacts: config::ArtifactArgs,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable debug logging to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict the built-in example observations
    Batch,

    /// Predict a single observation
    Predict {
        /// Temperature in °C
        #[arg(long, allow_negative_numbers = true, value_parser = finite_f64)]
        temperature: f64,

        /// Relative humidity in %
        #[arg(long, allow_negative_numbers = true, value_parser = finite_f64)]
        humidity: f64,

        /// Wind speed in km/h
        #[arg(long, allow_negative_numbers = true, value_parser = finite_f64)]
        windspeed: f64,

        /// Latitude, echoed for map placement
        #[arg(
            long,
            allow_negative_numbers = true,
            value_parser = finite_f64,
            requires = "longitude"
        )]
        latitude: Option<f64>,

        /// Longitude, echoed for map placement
        #[arg(
            long,
            allow_negative_numbers = true,
            value_parser = finite_f64,
            requires = "latitude"
        )]
        longitude: Option<f64>,
    },

    /// Show the loaded classifier and normalizers
    Inspect,
}

/// Parse a float, rejecting NaN and infinities
fn finite_f64(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|e| format!("'{}' is not a number: {}", s, e))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("'{}' is not a finite number", s))
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(filter))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.artifacts.to_config();
    debug!(
        classifier = %config.classifier_path.display(),
        normalizers = %config.normalizers_path.display(),
        layout = %config.normalizer_layout,
        "Resolved artifact locations"
    );
    let service = commands::open_service(config);

    match cli.command {
        Commands::Batch => predict::run_batch(&service, cli.format)?,
        Commands::Predict {
            temperature,
            humidity,
            windspeed,
            latitude,
            longitude,
        } => {
            let request = PredictionRequest {
                features: RawFeatures::new(temperature, humidity, windspeed),
                latitude,
                longitude,
            };
            predict::run_predict(&service, request, cli.format)?;
        }
        Commands::Inspect => inspect::run_inspect(&service, cli.format)?,
    }

    Ok(())
}

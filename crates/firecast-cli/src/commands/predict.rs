//! Batch and single-record prediction commands

use anyhow::{Context, Result};
use colored::Colorize;
use firecast_lib::{PredictionRequest, PredictionService, RawFeatures};
use tabled::Tabled;

use crate::output::{
    color_confidence, color_label, format_probability, occurrence_line, print_json, OutputFormat,
};

/// Fixed observations evaluated by `firecast batch`
pub const BATCH_EXAMPLES: [(f64, f64, f64); 3] =
    [(15.0, 60.0, 20.0), (32.0, 25.0, 45.0), (28.0, 35.0, 25.0)];

/// Row for the single prediction table
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Temp (°C)")]
    temperature: f64,
    #[tabled(rename = "Humidity (%)")]
    humidity: f64,
    #[tabled(rename = "Wind (km/h)")]
    windspeed: f64,
    #[tabled(rename = "Fire Occurrence")]
    label: String,
    #[tabled(rename = "P(fire)")]
    fire_probability: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

/// Predict the fixed examples; the first failure aborts the run
pub fn run_batch(service: &PredictionService, format: OutputFormat) -> Result<()> {
    let requests: Vec<PredictionRequest> = BATCH_EXAMPLES
        .iter()
        .map(|&(t, h, w)| PredictionRequest {
            features: RawFeatures::new(t, h, w),
            latitude: None,
            longitude: None,
        })
        .collect();

    let predictions = requests
        .iter()
        .map(|request| service.predict_labeled(request))
        .collect::<Result<Vec<_>, _>>()
        .context("Batch prediction failed")?;

    match format {
        OutputFormat::Json => print_json(&predictions)?,
        OutputFormat::Table => {
            for prediction in &predictions {
                println!("{}", occurrence_line(&prediction.features, prediction.result.label));
            }
        }
    }

    Ok(())
}

/// Predict one observation
pub fn run_predict(
    service: &PredictionService,
    request: PredictionRequest,
    format: OutputFormat,
) -> Result<()> {
    let prediction = service
        .predict_labeled(&request)
        .context("Prediction failed")?;

    match format {
        OutputFormat::Json => print_json(&prediction)?,
        OutputFormat::Table => {
            let row = PredictionRow {
                temperature: prediction.features.temperature,
                humidity: prediction.features.humidity,
                windspeed: prediction.features.windspeed,
                label: color_label(prediction.result.label),
                fire_probability: prediction
                    .result
                    .probabilities
                    .map(|p| format_probability(p.fire))
                    .unwrap_or_else(|| "-".to_string()),
                confidence: prediction
                    .result
                    .confidence()
                    .map(color_confidence)
                    .unwrap_or_else(|| "-".to_string()),
            };

            let table = tabled::Table::new([row])
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            if let Some(location) = prediction.location {
                println!(
                    "Location: {}",
                    format!("{:.4}, {:.4}", location.latitude, location.longitude).cyan()
                );
            }
        }
    }

    Ok(())
}

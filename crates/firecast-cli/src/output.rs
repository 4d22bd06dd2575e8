//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use firecast_lib::{FireLabel, RawFeatures};
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text and tables (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// The one-line report used by batch runs
pub fn occurrence_line(features: &RawFeatures, label: FireLabel) -> String {
    format!(
        "For Temp={}°C, Humidity={}%, Wind Speed={} km/h: Fire Occurrence = {}",
        features.temperature, features.humidity, features.windspeed, label
    )
}

/// Format a probability as percentage
pub fn format_probability(probability: f32) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// Color a label: fire in red, no fire in green
pub fn color_label(label: FireLabel) -> String {
    match label {
        FireLabel::Fire => label.to_string().red().bold().to_string(),
        FireLabel::NoFire => label.to_string().green().to_string(),
    }
}

/// Color confidence based on value
pub fn color_confidence(confidence: f32) -> String {
    let formatted = format_probability(confidence);
    if confidence >= 0.8 {
        formatted.green().to_string()
    } else if confidence >= 0.6 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

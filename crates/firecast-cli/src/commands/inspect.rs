//! Artifact inspection command

use anyhow::{Context, Result};
use colored::Colorize;
use firecast_lib::{ClassifierVariant, PredictionService};
use tabled::Tabled;

use crate::output::{print_json, print_success, print_warning, OutputFormat};

/// Row for the normalizer table
#[derive(Tabled)]
struct NormalizerRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Min")]
    min: f64,
    #[tabled(rename = "Max")]
    max: f64,
}

/// Load the artifacts and describe them
pub fn run_inspect(service: &PredictionService, format: OutputFormat) -> Result<()> {
    let artifacts = service
        .store()
        .load()
        .context("Failed to load artifacts")?;
    let summary = artifacts.summary();

    match format {
        OutputFormat::Json => print_json(summary)?,
        OutputFormat::Table => {
            println!("{}", "Classifier".bold());
            println!("{}", "=".repeat(60));
            println!("Path:     {}", summary.classifier_path.display().to_string().cyan());
            println!("Format:   {}", summary.classifier_format);
            println!("Variant:  {}", summary.classifier_variant);
            if let Some(classes) = &summary.classes {
                println!("Classes:  {:?}", classes);
            }
            println!("SHA-256:  {}", summary.classifier_sha256);
            println!();

            println!("{}", "Normalizers".bold());
            println!("{}", "=".repeat(60));
            println!("Path:     {}", summary.normalizers_path.display().to_string().cyan());
            println!("Layout:   {}", summary.normalizer_layout);

            let rows: Vec<NormalizerRow> = summary
                .normalizers
                .iter()
                .map(|range| NormalizerRow {
                    feature: range.feature.to_string(),
                    min: range.min,
                    max: range.max,
                })
                .collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!();

            if summary.normalizers.iter().any(|r| r.min == r.max) {
                print_warning("A normalizer has min == max; predictions will fail");
            }
            if summary.classifier_variant == ClassifierVariant::ClassWise {
                print_warning("Classifier reports labels only; no probabilities available");
            }
            print_success("Artifacts loaded");
        }
    }

    Ok(())
}

//! Normalizer artifact layouts
//!
//! Fitted scalers arrive either as one object per feature
//! (`{"temp_scaler": {...}, ...}`) or as a single multi-column scaler. Both
//! are resolved into a [`NormalizerSet`] keyed by feature identity.

use crate::error::{PipelineError, PipelineResult};
use crate::models::{FeatureId, NUM_FEATURES};
use crate::predictor::{FeatureNormalizer, NormalizerSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Suffix used by per-feature scaler keys
const SCALER_KEY_SUFFIX: &str = "_scaler";

/// How the fitted normalizers are stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizerLayout {
    /// One scaler object per feature
    #[default]
    PerFeature,
    /// One scaler fitted on all three columns
    Combined,
}

impl fmt::Display for NormalizerLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizerLayout::PerFeature => f.write_str("per_feature"),
            NormalizerLayout::Combined => f.write_str("combined"),
        }
    }
}

impl FromStr for NormalizerLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "per_feature" => Ok(NormalizerLayout::PerFeature),
            "combined" => Ok(NormalizerLayout::Combined),
            other => Err(format!("unknown normalizer layout '{}'", other)),
        }
    }
}

/// A fitted statistic, stored bare or as a one-element array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Statistic {
    Value(f64),
    Column(Vec<f64>),
}

impl Statistic {
    fn single(&self) -> Result<f64, String> {
        match self {
            Statistic::Value(v) => Ok(*v),
            Statistic::Column(values) if values.len() == 1 => Ok(values[0]),
            Statistic::Column(values) => Err(format!(
                "expected a single value, found {} columns",
                values.len()
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SingleScaler {
    data_min: Statistic,
    data_max: Statistic,
}

#[derive(Debug, Deserialize)]
struct CombinedScaler {
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    data_min: Vec<f64>,
    data_max: Vec<f64>,
}

/// Parse a normalizer artifact in the given layout
pub fn parse_normalizers(
    bytes: &[u8],
    layout: NormalizerLayout,
    path: &Path,
) -> PipelineResult<NormalizerSet> {
    let normalizers = match layout {
        NormalizerLayout::PerFeature => parse_per_feature(bytes),
        NormalizerLayout::Combined => parse_combined(bytes),
    }
    .map_err(|reason| PipelineError::corrupt(path, reason))?;

    for normalizer in &normalizers {
        if !normalizer.min().is_finite() || !normalizer.max().is_finite() {
            return Err(PipelineError::corrupt(
                path,
                format!("non-finite range for {}", normalizer.feature()),
            ));
        }
        if normalizer.is_degenerate() {
            warn!(
                feature = %normalizer.feature(),
                value = normalizer.min(),
                "Fitted normalizer has min == max, predictions will fail"
            );
        }
    }

    NormalizerSet::from_normalizers(normalizers).map_err(|reason| PipelineError::corrupt(path, reason))
}

fn parse_per_feature(bytes: &[u8]) -> Result<Vec<FeatureNormalizer>, String> {
    let scalers: BTreeMap<String, SingleScaler> =
        serde_json::from_slice(bytes).map_err(|e| format!("invalid scaler map: {}", e))?;

    let mut out = Vec::with_capacity(scalers.len());
    for (key, scaler) in scalers {
        let name = key.strip_suffix(SCALER_KEY_SUFFIX).unwrap_or(&key);
        let feature = FeatureId::from_str(name).map_err(|e| format!("scaler '{}': {}", key, e))?;
        let min = scaler
            .data_min
            .single()
            .map_err(|e| format!("scaler '{}' data_min: {}", key, e))?;
        let max = scaler
            .data_max
            .single()
            .map_err(|e| format!("scaler '{}' data_max: {}", key, e))?;
        out.push(FeatureNormalizer::new(feature, min, max));
    }
    Ok(out)
}

fn parse_combined(bytes: &[u8]) -> Result<Vec<FeatureNormalizer>, String> {
    let scaler: CombinedScaler =
        serde_json::from_slice(bytes).map_err(|e| format!("invalid combined scaler: {}", e))?;

    let features: Vec<FeatureId> = match &scaler.feature_names {
        Some(names) => names
            .iter()
            .map(|n| FeatureId::from_str(n))
            .collect::<Result<_, _>>()?,
        None => FeatureId::ALL.to_vec(),
    };

    if features.len() != NUM_FEATURES
        || scaler.data_min.len() != NUM_FEATURES
        || scaler.data_max.len() != NUM_FEATURES
    {
        return Err(format!(
            "combined scaler has {} names, {} minimums, {} maximums; expected {} of each",
            features.len(),
            scaler.data_min.len(),
            scaler.data_max.len(),
            NUM_FEATURES
        ));
    }

    Ok(features
        .into_iter()
        .zip(scaler.data_min)
        .zip(scaler.data_max)
        .map(|((feature, min), max)| FeatureNormalizer::new(feature, min, max))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str, layout: NormalizerLayout) -> PipelineResult<NormalizerSet> {
        parse_normalizers(json.as_bytes(), layout, Path::new("scalers.json"))
    }

    #[test]
    fn test_per_feature_layout() {
        let set = parse(
            r#"{
                "temp_scaler": {"data_min": 0.0, "data_max": 40.0},
                "humidity_scaler": {"data_min": [10.0], "data_max": [100.0]},
                "windspeed_scaler": {"data_min": 0.0, "data_max": 60.0, "scale_": [0.016]}
            }"#,
            NormalizerLayout::PerFeature,
        )
        .unwrap();
        assert_eq!(set.get(FeatureId::Temperature).max(), 40.0);
        assert_eq!(set.get(FeatureId::Humidity).min(), 10.0);
        assert_eq!(set.get(FeatureId::Windspeed).max(), 60.0);
    }

    #[test]
    fn test_per_feature_aliases() {
        let set = parse(
            r#"{
                "temperature_scaler": {"data_min": 0.0, "data_max": 40.0},
                "humidity_scaler": {"data_min": 10.0, "data_max": 100.0},
                "wind_speed_scaler": {"data_min": 0.0, "data_max": 60.0}
            }"#,
            NormalizerLayout::PerFeature,
        )
        .unwrap();
        assert_eq!(set.get(FeatureId::Windspeed).max(), 60.0);
    }

    #[test]
    fn test_per_feature_missing_scaler() {
        let err = parse(
            r#"{
                "temp_scaler": {"data_min": 0.0, "data_max": 40.0},
                "humidity_scaler": {"data_min": 10.0, "data_max": 100.0}
            }"#,
            NormalizerLayout::PerFeature,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "artifact_corrupt");
        assert!(err.to_string().contains("windspeed"));
    }

    #[test]
    fn test_per_feature_unknown_scaler() {
        let err = parse(
            r#"{"pressure_scaler": {"data_min": 900.0, "data_max": 1100.0}}"#,
            NormalizerLayout::PerFeature,
        )
        .unwrap_err();
        assert!(err.to_string().contains("pressure"));
    }

    #[test]
    fn test_per_feature_multi_column_statistic() {
        let err = parse(
            r#"{
                "temp_scaler": {"data_min": [0.0, 1.0], "data_max": [40.0, 41.0]},
                "humidity_scaler": {"data_min": 10.0, "data_max": 100.0},
                "windspeed_scaler": {"data_min": 0.0, "data_max": 60.0}
            }"#,
            NormalizerLayout::PerFeature,
        )
        .unwrap_err();
        assert!(err.to_string().contains("2 columns"));
    }

    #[test]
    fn test_combined_layout_binds_by_name() {
        let set = parse(
            r#"{
                "feature_names": ["humidity", "windspeed", "temp"],
                "data_min": [10.0, 0.0, 0.0],
                "data_max": [100.0, 60.0, 40.0]
            }"#,
            NormalizerLayout::Combined,
        )
        .unwrap();
        assert_eq!(set.get(FeatureId::Temperature).max(), 40.0);
        assert_eq!(set.get(FeatureId::Humidity).max(), 100.0);
        assert_eq!(set.get(FeatureId::Windspeed).max(), 60.0);
    }

    #[test]
    fn test_combined_layout_defaults_to_training_order() {
        let set = parse(
            r#"{"data_min": [0.0, 10.0, 0.0], "data_max": [40.0, 100.0, 60.0]}"#,
            NormalizerLayout::Combined,
        )
        .unwrap();
        assert_eq!(set.get(FeatureId::Temperature).max(), 40.0);
        assert_eq!(set.get(FeatureId::Humidity).min(), 10.0);
    }

    #[test]
    fn test_combined_layout_wrong_width() {
        let err = parse(
            r#"{"data_min": [0.0, 10.0], "data_max": [40.0, 100.0]}"#,
            NormalizerLayout::Combined,
        )
        .unwrap_err();
        assert!(err.to_string().contains("expected 3"));
    }

    #[test]
    fn test_combined_layout_duplicate_name() {
        let err = parse(
            r#"{
                "feature_names": ["temp", "temp", "humidity"],
                "data_min": [0.0, 0.0, 10.0],
                "data_max": [40.0, 40.0, 100.0]
            }"#,
            NormalizerLayout::Combined,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_degenerate_range_loads() {
        let set = parse(
            r#"{"data_min": [0.0, 50.0, 0.0], "data_max": [40.0, 50.0, 60.0]}"#,
            NormalizerLayout::Combined,
        )
        .unwrap();
        assert!(set.get(FeatureId::Humidity).is_degenerate());
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("per-feature".parse::<NormalizerLayout>().unwrap(), NormalizerLayout::PerFeature);
        assert_eq!("combined".parse::<NormalizerLayout>().unwrap(), NormalizerLayout::Combined);
        assert!("three".parse::<NormalizerLayout>().is_err());
    }
}

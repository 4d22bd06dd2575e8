//! Core data models for the fire occurrence predictor

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of features the classifier was trained on
pub const NUM_FEATURES: usize = 3;

/// Raw weather observation as produced by an input collector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFeatures {
    /// Air temperature in °C
    pub temperature: f64,
    /// Relative humidity in %
    pub humidity: f64,
    /// Wind speed in km/h
    pub windspeed: f64,
}

impl RawFeatures {
    pub fn new(temperature: f64, humidity: f64, windspeed: f64) -> Self {
        Self {
            temperature,
            humidity,
            windspeed,
        }
    }

    /// Raw value for one feature
    pub fn get(&self, feature: FeatureId) -> f64 {
        match feature {
            FeatureId::Temperature => self.temperature,
            FeatureId::Humidity => self.humidity,
            FeatureId::Windspeed => self.windspeed,
        }
    }
}

/// Identity of a model input feature.
///
/// Declaration order is the training-time column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureId {
    Temperature,
    Humidity,
    Windspeed,
}

impl FeatureId {
    /// All features in training order
    pub const ALL: [FeatureId; NUM_FEATURES] = [
        FeatureId::Temperature,
        FeatureId::Humidity,
        FeatureId::Windspeed,
    ];

    /// Column index in the feature vector
    pub const fn index(self) -> usize {
        match self {
            FeatureId::Temperature => 0,
            FeatureId::Humidity => 1,
            FeatureId::Windspeed => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureId::Temperature => "temperature",
            FeatureId::Humidity => "humidity",
            FeatureId::Windspeed => "windspeed",
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temp" | "temperature" => Ok(FeatureId::Temperature),
            "humidity" => Ok(FeatureId::Humidity),
            "windspeed" | "wind_speed" => Ok(FeatureId::Windspeed),
            other => Err(format!("unknown feature name '{}'", other)),
        }
    }
}

/// Scaled model input in training order (temperature, humidity, windspeed).
///
/// Only the feature assembler builds these, so the column order cannot drift
/// from what the classifier expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f32; NUM_FEATURES]);

impl FeatureVector {
    pub(crate) fn from_ordered(values: [f32; NUM_FEATURES]) -> Self {
        Self(values)
    }

    pub fn temperature(&self) -> f32 {
        self.0[FeatureId::Temperature.index()]
    }

    pub fn humidity(&self) -> f32 {
        self.0[FeatureId::Humidity.index()]
    }

    pub fn windspeed(&self) -> f32 {
        self.0[FeatureId::Windspeed.index()]
    }

    pub fn get(&self, feature: FeatureId) -> f32 {
        self.0[feature.index()]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Predicted fire occurrence class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireLabel {
    NoFire,
    Fire,
}

impl FireLabel {
    /// Map a raw class value emitted by the classifier
    pub fn from_class(class: i64) -> Option<Self> {
        match class {
            0 => Some(FireLabel::NoFire),
            1 => Some(FireLabel::Fire),
            _ => None,
        }
    }

    /// Raw class value the model was trained with
    pub fn class_value(self) -> i64 {
        match self {
            FireLabel::NoFire => 0,
            FireLabel::Fire => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FireLabel::NoFire => "no_fire",
            FireLabel::Fire => "fire",
        }
    }
}

impl fmt::Display for FireLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FireLabel::NoFire => f.write_str("No Fire"),
            FireLabel::Fire => f.write_str("Fire"),
        }
    }
}

/// Probability distribution over the two labels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub no_fire: f32,
    pub fire: f32,
}

impl ClassProbabilities {
    pub fn of(&self, label: FireLabel) -> f32 {
        match label {
            FireLabel::NoFire => self.no_fire,
            FireLabel::Fire => self.fire,
        }
    }
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: FireLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<ClassProbabilities>,
}

impl PredictionResult {
    /// Probability of the predicted label, when the classifier provides one
    pub fn confidence(&self) -> Option<f32> {
        self.probabilities.map(|p| p.of(self.label))
    }
}

/// Map placement for a prediction; never reaches the classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Record submitted by the interactive input collector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(flatten)]
    pub features: RawFeatures,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl PredictionRequest {
    /// Location, present only when both coordinates were supplied
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

/// Prediction handed to the visualizer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledPrediction {
    pub features: RawFeatures,
    #[serde(flatten)]
    pub result: PredictionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub predicted_at: i64,
}

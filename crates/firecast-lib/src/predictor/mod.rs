//! Fire occurrence inference pipeline

mod classifier;
mod features;
mod forest;
mod inference;
mod normalizer;
mod service;

#[cfg(test)]
mod tests;

pub use classifier::{
    ClassWiseClassifier, Classifier, ClassifierFormat, ClassifierVariant, ProbabilisticClassifier,
};
pub use features::{
    Feature, FeatureAssembler, Humidity, Scaled, ScaledTriple, Temperature, Windspeed,
};
pub use forest::{ForestClassifier, TreeNode};
pub use inference::OnnxClassifier;
pub use normalizer::{FeatureNormalizer, NormalizerSet};
pub use service::{PredictionService, ServiceStats, SLOW_PREDICTION_MS};

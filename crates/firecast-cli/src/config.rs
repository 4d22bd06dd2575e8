//! Artifact locations for the CLI

use clap::Args;
use firecast_lib::{ArtifactConfig, ClassifierFormat, NormalizerLayout};
use std::path::PathBuf;

/// Where to find the classifier and normalizers
#[derive(Debug, Clone, Args)]
pub struct ArtifactArgs {
    /// Serialized classifier (forest JSON or ONNX)
    #[arg(
        long,
        env = "FIRECAST_CLASSIFIER",
        default_value = "artifacts/random_forest_model.json",
        global = true
    )]
    pub classifier: PathBuf,

    /// Fitted min-max normalizers
    #[arg(
        long,
        env = "FIRECAST_NORMALIZERS",
        default_value = "artifacts/minmax_scalers.json",
        global = true
    )]
    pub normalizers: PathBuf,

    /// Normalizer layout (per_feature or combined)
    #[arg(long, env = "FIRECAST_NORMALIZER_LAYOUT", default_value = "per_feature", global = true)]
    pub layout: NormalizerLayout,

    /// Classifier format (forest or onnx); inferred from the extension when omitted
    #[arg(long, env = "FIRECAST_CLASSIFIER_FORMAT", global = true)]
    pub classifier_format: Option<ClassifierFormat>,

    /// Expected SHA-256 of the classifier file
    #[arg(long, env = "FIRECAST_CLASSIFIER_SHA256", global = true)]
    pub classifier_sha256: Option<String>,

    /// Expected SHA-256 of the normalizer file
    #[arg(long, env = "FIRECAST_NORMALIZERS_SHA256", global = true)]
    pub normalizers_sha256: Option<String>,
}

impl ArtifactArgs {
    pub fn to_config(&self) -> ArtifactConfig {
        ArtifactConfig {
            classifier_format: self.classifier_format,
            normalizer_layout: self.layout,
            classifier_sha256: self.classifier_sha256.clone(),
            normalizers_sha256: self.normalizers_sha256.clone(),
            ..ArtifactConfig::new(&self.classifier, &self.normalizers)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        artifacts: ArtifactArgs,
    }

    #[test]
    fn test_flags_map_to_config() {
        let cli = TestCli::parse_from([
            "firecast",
            "--classifier",
            "/models/forest.onnx",
            "--normalizers",
            "/models/scaler.json",
            "--layout",
            "combined",
            "--classifier-format",
            "onnx",
        ]);
        let config = cli.artifacts.to_config();

        assert_eq!(config.classifier_path, PathBuf::from("/models/forest.onnx"));
        assert_eq!(config.normalizers_path, PathBuf::from("/models/scaler.json"));
        assert_eq!(config.normalizer_layout, NormalizerLayout::Combined);
        assert_eq!(config.classifier_format, Some(ClassifierFormat::Onnx));
        assert!(config.classifier_sha256.is_none());
    }

    #[test]
    fn test_invalid_layout_is_rejected() {
        let result = TestCli::try_parse_from(["firecast", "--layout", "columnar"]);
        assert!(result.is_err());
    }
}

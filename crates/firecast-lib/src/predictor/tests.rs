//! End-to-end pipeline tests
//!
//! These tests verify:
//! - Golden labels for the reference scenarios
//! - The same scenarios through an ONNX graph
//! - Both normalizer layouts yield the same predictions
//! - Error propagation from the artifact store and normalizers

use super::*;
use crate::artifacts::{ArtifactConfig, ArtifactStore, NormalizerLayout};
use crate::error::PipelineError;
use crate::models::{FeatureId, FireLabel, PredictionRequest, RawFeatures};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const EPS: f32 = 1e-5;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn service_with(classifier: &str, normalizers: &str, layout: NormalizerLayout) -> PredictionService {
    let config = ArtifactConfig::new(fixture(classifier), fixture(normalizers)).with_layout(layout);
    PredictionService::new(Arc::new(ArtifactStore::new(config)))
}

fn reference_service() -> PredictionService {
    service_with("forest.json", "minmax_scalers.json", NormalizerLayout::PerFeature)
}

/// The three reference observations and their captured labels
fn scenarios() -> Vec<(RawFeatures, FireLabel, f32)> {
    vec![
        (RawFeatures::new(15.0, 60.0, 20.0), FireLabel::NoFire, 0.25 / 3.0),
        (RawFeatures::new(32.0, 25.0, 45.0), FireLabel::Fire, 0.9),
        (RawFeatures::new(28.0, 35.0, 25.0), FireLabel::Fire, 2.3 / 3.0),
    ]
}

mod golden_scenarios {
    use super::*;

    #[test]
    fn test_scenario_mild_day_no_fire() {
        let service = reference_service();
        let result = service.predict(&RawFeatures::new(15.0, 60.0, 20.0)).unwrap();
        assert_eq!(result.label, FireLabel::NoFire);
    }

    #[test]
    fn test_scenario_hot_dry_windy_fire() {
        let service = reference_service();
        let result = service.predict(&RawFeatures::new(32.0, 25.0, 45.0)).unwrap();
        assert_eq!(result.label, FireLabel::Fire);
    }

    #[test]
    fn test_scenario_probabilities() {
        let service = reference_service();
        for (raw, label, fire_probability) in scenarios() {
            let result = service.predict(&raw).unwrap();
            assert_eq!(result.label, label, "label for {:?}", raw);

            let probabilities = result.probabilities.expect("forest fixture is probabilistic");
            assert!(
                (probabilities.fire - fire_probability).abs() < EPS,
                "fire probability {} for {:?}, expected {}",
                probabilities.fire,
                raw,
                fire_probability
            );
            assert!((probabilities.fire + probabilities.no_fire - 1.0).abs() < EPS);
            assert_eq!(result.confidence(), Some(probabilities.of(label)));
        }
    }

    #[test]
    fn test_combined_layout_matches_per_feature() {
        let per_feature = reference_service();
        let combined = service_with("forest.json", "combined_scaler.json", NormalizerLayout::Combined);
        for (raw, _, _) in scenarios() {
            assert_eq!(per_feature.predict(&raw).unwrap(), combined.predict(&raw).unwrap());
        }
    }

    #[test]
    fn test_vote_forest_is_class_wise() {
        let service = service_with("forest_votes.json", "minmax_scalers.json", NormalizerLayout::PerFeature);
        for (raw, label, _) in scenarios() {
            let result = service.predict(&raw).unwrap();
            assert_eq!(result.label, label, "label for {:?}", raw);
            assert!(result.probabilities.is_none());
        }
    }
}

mod onnx_scenarios {
    use super::*;
    use crate::predictor::ClassifierVariant;

    // logistic.onnx: P(fire) = sigmoid(4·t − 4·h + 2·w − 1) on scaled inputs
    fn onnx_scenarios() -> Vec<(RawFeatures, FireLabel, f32)> {
        vec![
            (RawFeatures::new(15.0, 60.0, 20.0), FireLabel::NoFire, 0.25816),
            (RawFeatures::new(32.0, 25.0, 45.0), FireLabel::Fire, 0.95406),
            (RawFeatures::new(28.0, 35.0, 25.0), FireLabel::Fire, 0.82087),
        ]
    }

    #[test]
    fn test_onnx_golden_labels_and_probabilities() {
        let service = service_with("logistic.onnx", "minmax_scalers.json", NormalizerLayout::PerFeature);
        for (raw, label, fire_probability) in onnx_scenarios() {
            let result = service.predict(&raw).unwrap();
            assert_eq!(result.label, label, "label for {:?}", raw);

            let probabilities = result.probabilities.expect("two-output graph is probabilistic");
            assert!(
                (probabilities.fire - fire_probability).abs() < 1e-4,
                "fire probability {} for {:?}, expected {}",
                probabilities.fire,
                raw,
                fire_probability
            );
            assert!((probabilities.fire + probabilities.no_fire - 1.0).abs() < EPS);
        }

        let artifacts = service.store().load().unwrap();
        assert_eq!(artifacts.summary().classifier_variant, ClassifierVariant::Probabilistic);
    }

    #[test]
    fn test_onnx_label_only_graph() {
        let service = service_with(
            "logistic_labels.onnx",
            "minmax_scalers.json",
            NormalizerLayout::PerFeature,
        );
        for (raw, label, _) in onnx_scenarios() {
            let result = service.predict(&raw).unwrap();
            assert_eq!(result.label, label, "label for {:?}", raw);
            assert!(result.probabilities.is_none());
            assert_eq!(result.confidence(), None);
        }
    }

    #[test]
    fn test_first_prediction_excludes_artifact_load() {
        let service = service_with("logistic.onnx", "minmax_scalers.json", NormalizerLayout::PerFeature);
        service.predict(&RawFeatures::new(32.0, 25.0, 45.0)).unwrap();

        let stats = service.stats();
        assert_eq!(stats.total_predictions, 1);
        assert_eq!(stats.slow_predictions, 0);
    }
}

mod pipeline_properties {
    use super::*;

    #[test]
    fn test_predict_is_deterministic() {
        let service = reference_service();
        let raw = RawFeatures::new(21.5, 47.0, 33.3);
        let first = service.predict(&raw).unwrap();
        for _ in 0..10 {
            assert_eq!(service.predict(&raw).unwrap(), first);
        }
    }

    #[test]
    fn test_out_of_range_inputs_are_accepted() {
        let service = reference_service();
        let result = service.predict(&RawFeatures::new(55.0, 2.0, 120.0)).unwrap();
        assert_eq!(result.label, FireLabel::Fire);

        let result = service.predict(&RawFeatures::new(-20.0, 150.0, 0.0)).unwrap();
        assert_eq!(result.label, FireLabel::NoFire);
    }

    #[test]
    fn test_concurrent_predictions() {
        let service = Arc::new(reference_service());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                std::thread::spawn(move || {
                    scenarios()
                        .into_iter()
                        .map(|(raw, _, _)| service.predict(&raw).unwrap().label)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let expected: Vec<_> = scenarios().into_iter().map(|(_, label, _)| label).collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
        assert_eq!(service.stats().total_predictions, 8 * 3);
    }

    #[test]
    fn test_batch_prediction() {
        let service = reference_service();
        let inputs: Vec<_> = scenarios().into_iter().map(|(raw, _, _)| raw).collect();
        let results = service.predict_batch(&inputs).unwrap();
        let labels: Vec<_> = results.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![FireLabel::NoFire, FireLabel::Fire, FireLabel::Fire]);

        let stats = service.stats();
        assert_eq!(stats.total_predictions, 3);
        assert_eq!(stats.fire_predictions, 2);
        assert_eq!(stats.failed_predictions, 0);
    }

    #[test]
    fn test_labeled_prediction_keeps_location_out_of_features() {
        let service = reference_service();
        let request = PredictionRequest {
            features: RawFeatures::new(32.0, 25.0, 45.0),
            latitude: Some(-33.9),
            longitude: Some(151.2),
        };
        let labeled = service.predict_labeled(&request).unwrap();
        assert_eq!(labeled.result, service.predict(&request.features).unwrap());
        assert_eq!(labeled.features, request.features);
        let location = labeled.location.unwrap();
        assert_eq!(location.latitude, -33.9);
        assert_eq!(location.longitude, 151.2);
        assert!(labeled.predicted_at > 0);
    }
}

mod error_propagation {
    use super::*;

    #[test]
    fn test_missing_classifier_fails_before_normalization() {
        // Degenerate scalers would fail normalization; the missing model must win
        let dir = TempDir::new().unwrap();
        let scalers = dir.path().join("scalers.json");
        std::fs::write(
            &scalers,
            r#"{"data_min": [5.0, 5.0, 5.0], "data_max": [5.0, 5.0, 5.0]}"#,
        )
        .unwrap();
        let config = ArtifactConfig::new(dir.path().join("random_forest_model.json"), &scalers)
            .with_layout(NormalizerLayout::Combined);
        let service = PredictionService::new(Arc::new(ArtifactStore::new(config)));

        let err = service.predict(&RawFeatures::new(15.0, 60.0, 20.0)).unwrap_err();
        assert_eq!(err.kind(), "artifact_missing");
        assert_eq!(service.stats().failed_predictions, 1);
    }

    #[test]
    fn test_artifact_failure_is_permanent() {
        let dir = TempDir::new().unwrap();
        let config = ArtifactConfig::new(dir.path().join("model.json"), fixture("minmax_scalers.json"));
        let service = PredictionService::new(Arc::new(ArtifactStore::new(config)));

        let first = service.predict(&RawFeatures::new(15.0, 60.0, 20.0)).unwrap_err();
        std::fs::copy(fixture("forest.json"), dir.path().join("model.json")).unwrap();
        let second = service.predict(&RawFeatures::new(15.0, 60.0, 20.0)).unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn test_degenerate_scaler_surfaces_unchanged() {
        let dir = TempDir::new().unwrap();
        let scalers = dir.path().join("scalers.json");
        std::fs::write(
            &scalers,
            r#"{"data_min": [0.0, 40.0, 0.0], "data_max": [40.0, 40.0, 60.0]}"#,
        )
        .unwrap();
        let config = ArtifactConfig::new(fixture("forest.json"), &scalers)
            .with_layout(NormalizerLayout::Combined);
        let service = PredictionService::new(Arc::new(ArtifactStore::new(config)));

        let err = service.predict(&RawFeatures::new(15.0, 60.0, 20.0)).unwrap_err();
        assert_eq!(
            err,
            PipelineError::DegenerateScale {
                feature: FeatureId::Humidity,
                value: 40.0,
            }
        );
    }

    #[test]
    fn test_corrupt_classifier() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("model.json");
        std::fs::write(&model, r#"{"n_features": 3, "classes": [0, 1], "trees": []}"#).unwrap();
        let config = ArtifactConfig::new(&model, fixture("minmax_scalers.json"));
        let service = PredictionService::new(Arc::new(ArtifactStore::new(config)));

        let err = service.predict(&RawFeatures::new(15.0, 60.0, 20.0)).unwrap_err();
        assert_eq!(err.kind(), "artifact_corrupt");
    }

    #[test]
    fn test_unknown_class_is_invocation_failure() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("model.json");
        std::fs::write(
            &model,
            r#"{"n_features": 3, "classes": [0, 7], "trees": [{"nodes": [{"value": [0.0, 1.0]}]}]}"#,
        )
        .unwrap();
        let config = ArtifactConfig::new(&model, fixture("minmax_scalers.json"));
        let service = PredictionService::new(Arc::new(ArtifactStore::new(config)));

        let err = service.predict(&RawFeatures::new(15.0, 60.0, 20.0)).unwrap_err();
        assert_eq!(err.kind(), "classifier_invocation_failure");
    }

    #[test]
    fn test_batch_aborts_on_first_error() {
        let dir = TempDir::new().unwrap();
        let config = ArtifactConfig::new(dir.path().join("model.json"), fixture("minmax_scalers.json"));
        let service = PredictionService::new(Arc::new(ArtifactStore::new(config)));

        let inputs = vec![RawFeatures::new(15.0, 60.0, 20.0); 3];
        assert!(service.predict_batch(&inputs).is_err());
        assert_eq!(service.stats().failed_predictions, 1);
    }
}

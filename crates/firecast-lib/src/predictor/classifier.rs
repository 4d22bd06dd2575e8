//! Classifier capabilities
//!
//! A loaded artifact either produces only a class (`ClassWiseClassifier`) or
//! a class plus a distribution over classes (`ProbabilisticClassifier`).
//! Which one is decided once at load time from what the artifact carries.

use crate::error::{PipelineError, PipelineResult};
use crate::models::FeatureVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Artifact format a classifier was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierFormat {
    /// JSON tree ensemble evaluated natively
    Forest,
    /// ONNX graph run through tract
    Onnx,
}

impl fmt::Display for ClassifierFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierFormat::Forest => f.write_str("forest"),
            ClassifierFormat::Onnx => f.write_str("onnx"),
        }
    }
}

impl FromStr for ClassifierFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forest" | "json" => Ok(ClassifierFormat::Forest),
            "onnx" => Ok(ClassifierFormat::Onnx),
            other => Err(format!("unknown classifier format '{}'", other)),
        }
    }
}

/// Capability variant exposed by a loaded classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierVariant {
    ClassWise,
    Probabilistic,
}

impl fmt::Display for ClassifierVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierVariant::ClassWise => f.write_str("class_wise"),
            ClassifierVariant::Probabilistic => f.write_str("probabilistic"),
        }
    }
}

/// Classifier that returns only the predicted class
pub trait ClassWiseClassifier: Send + Sync {
    /// Raw class value for one feature vector
    fn predict(&self, features: &FeatureVector) -> PipelineResult<i64>;

    fn format(&self) -> ClassifierFormat;
}

/// Classifier that also reports a distribution over classes
pub trait ProbabilisticClassifier: ClassWiseClassifier {
    /// Class probabilities, one per entry of [`classes`](Self::classes)
    fn predict_proba(&self, features: &FeatureVector) -> PipelineResult<Vec<f32>>;

    /// Class and distribution together. Backends that produce both from one
    /// evaluation override this to avoid running the model twice.
    fn predict_with_proba(&self, features: &FeatureVector) -> PipelineResult<(i64, Vec<f32>)> {
        Ok((self.predict(features)?, self.predict_proba(features)?))
    }

    /// Raw class values in distribution column order
    fn classes(&self) -> &[i64];
}

/// Loaded classifier, tagged with its capability
pub enum Classifier {
    ClassWise(Box<dyn ClassWiseClassifier>),
    Probabilistic(Box<dyn ProbabilisticClassifier>),
}

impl Classifier {
    pub fn predict(&self, features: &FeatureVector) -> PipelineResult<i64> {
        match self {
            Classifier::ClassWise(c) => c.predict(features),
            Classifier::Probabilistic(c) => c.predict(features),
        }
    }

    /// Class values paired with probabilities, `None` for class-wise classifiers
    pub fn predict_proba(&self, features: &FeatureVector) -> Option<PipelineResult<Vec<(i64, f32)>>> {
        match self {
            Classifier::ClassWise(_) => None,
            Classifier::Probabilistic(c) => Some(
                c.predict_proba(features)
                    .and_then(|probs| pair_with_classes(c.classes(), probs)),
            ),
        }
    }

    /// Class and, when supported, the paired distribution from one evaluation
    pub fn classify(
        &self,
        features: &FeatureVector,
    ) -> PipelineResult<(i64, Option<Vec<(i64, f32)>>)> {
        match self {
            Classifier::ClassWise(c) => Ok((c.predict(features)?, None)),
            Classifier::Probabilistic(c) => {
                let (class, probs) = c.predict_with_proba(features)?;
                Ok((class, Some(pair_with_classes(c.classes(), probs)?)))
            }
        }
    }

    pub fn variant(&self) -> ClassifierVariant {
        match self {
            Classifier::ClassWise(_) => ClassifierVariant::ClassWise,
            Classifier::Probabilistic(_) => ClassifierVariant::Probabilistic,
        }
    }

    pub fn format(&self) -> ClassifierFormat {
        match self {
            Classifier::ClassWise(c) => c.format(),
            Classifier::Probabilistic(c) => c.format(),
        }
    }

    pub fn supports_probabilities(&self) -> bool {
        matches!(self, Classifier::Probabilistic(_))
    }
}

fn pair_with_classes(classes: &[i64], probs: Vec<f32>) -> PipelineResult<Vec<(i64, f32)>> {
    if probs.len() != classes.len() {
        return Err(PipelineError::ClassifierInvocationFailure(format!(
            "distribution has {} columns for {} classes",
            probs.len(),
            classes.len()
        )));
    }
    Ok(classes.iter().copied().zip(probs).collect())
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("format", &self.format())
            .field("variant", &self.variant())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_format_parsing() {
        assert_eq!("forest".parse::<ClassifierFormat>().unwrap(), ClassifierFormat::Forest);
        assert_eq!("JSON".parse::<ClassifierFormat>().unwrap(), ClassifierFormat::Forest);
        assert_eq!("onnx".parse::<ClassifierFormat>().unwrap(), ClassifierFormat::Onnx);
        assert!("pickle".parse::<ClassifierFormat>().is_err());
    }

    #[test]
    fn test_display_matches_serde() {
        for format in [ClassifierFormat::Forest, ClassifierFormat::Onnx] {
            let json = serde_json::to_string(&format).unwrap();
            assert_eq!(json, format!("\"{}\"", format));
        }
        let json = serde_json::to_string(&ClassifierVariant::ClassWise).unwrap();
        assert_eq!(json, "\"class_wise\"");
    }

    /// Counts evaluations so single-pass classification can be checked
    struct CountingModel {
        runs: AtomicUsize,
        columns: usize,
    }

    impl CountingModel {
        fn new(columns: usize) -> Self {
            Self {
                runs: AtomicUsize::new(0),
                columns,
            }
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    impl ClassWiseClassifier for Arc<CountingModel> {
        fn predict(&self, _features: &FeatureVector) -> PipelineResult<i64> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        }

        fn format(&self) -> ClassifierFormat {
            ClassifierFormat::Onnx
        }
    }

    impl ProbabilisticClassifier for Arc<CountingModel> {
        fn predict_proba(&self, _features: &FeatureVector) -> PipelineResult<Vec<f32>> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.5; self.columns])
        }

        fn predict_with_proba(&self, _features: &FeatureVector) -> PipelineResult<(i64, Vec<f32>)> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok((1, vec![0.25, 0.75]))
        }

        fn classes(&self) -> &[i64] {
            &[0, 1]
        }
    }

    #[test]
    fn test_classify_evaluates_once() {
        let model = Arc::new(CountingModel::new(2));
        let classifier = Classifier::Probabilistic(Box::new(model.clone()));
        let vector = FeatureVector::from_ordered([0.5, 0.5, 0.5]);

        let (class, probs) = classifier.classify(&vector).unwrap();
        assert_eq!(class, 1);
        assert_eq!(probs.unwrap(), vec![(0, 0.25), (1, 0.75)]);
        assert_eq!(model.runs(), 1);
    }

    #[test]
    fn test_class_wise_classify_has_no_distribution() {
        let model = Arc::new(CountingModel::new(2));
        let classifier = Classifier::ClassWise(Box::new(model.clone()));
        let vector = FeatureVector::from_ordered([0.5, 0.5, 0.5]);

        let (class, probs) = classifier.classify(&vector).unwrap();
        assert_eq!(class, 1);
        assert!(probs.is_none());
        assert_eq!(model.runs(), 1);
    }

    #[test]
    fn test_column_count_mismatch_is_invocation_failure() {
        let model = Arc::new(CountingModel::new(3));
        let classifier = Classifier::Probabilistic(Box::new(model));
        let vector = FeatureVector::from_ordered([0.5, 0.5, 0.5]);

        let err = classifier.predict_proba(&vector).unwrap().unwrap_err();
        assert!(matches!(err, PipelineError::ClassifierInvocationFailure(_)));
    }
}

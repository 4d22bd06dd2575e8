//! ONNX inference using tract
//!
//! Runs an exported classifier graph (e.g. a random forest converted with
//! its probability map disabled) on the assembled feature vector. Output 0
//! is the predicted label; a second output, when present, is the class
//! probability tensor.

use super::classifier::{
    ClassWiseClassifier, Classifier, ClassifierFormat, ProbabilisticClassifier,
};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{FeatureVector, NUM_FEATURES};
use anyhow::{bail, Context};
use std::path::Path;
use tract_onnx::prelude::*;
use tracing::debug;

/// Classes assumed for the probability tensor columns
const ONNX_CLASSES: [i64; 2] = [0, 1];

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based classifier using tract for lightweight inference
pub struct OnnxClassifier {
    model: TractModel,
    has_probabilities: bool,
}

impl OnnxClassifier {
    /// Load and optimize an ONNX model from bytes
    pub fn from_bytes(model_bytes: &[u8], path: &Path) -> PipelineResult<Self> {
        Self::load_model(model_bytes).map_err(|e| PipelineError::corrupt(path, format!("{:#}", e)))
    }

    fn load_model(model_bytes: &[u8]) -> TractResult<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?;

        let inputs = model.input_outlets()?.len();
        if inputs != 1 {
            bail!("ONNX model declares {} inputs, expected 1", inputs);
        }

        let model = model
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?;

        let outputs = model.output_outlets()?.len();
        if outputs == 0 {
            bail!("ONNX model declares no outputs");
        }

        let model = model
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        debug!(outputs = outputs, "Loaded ONNX classifier");
        Ok(Self {
            model,
            has_probabilities: outputs >= 2,
        })
    }

    pub fn has_probabilities(&self) -> bool {
        self.has_probabilities
    }

    /// Wrap in the capability variant this graph supports
    pub fn into_classifier(self) -> Classifier {
        if self.has_probabilities {
            Classifier::Probabilistic(Box::new(self))
        } else {
            Classifier::ClassWise(Box::new(self))
        }
    }

    /// Convert feature vector to tensor input
    fn features_to_tensor(features: &FeatureVector) -> TractResult<Tensor> {
        let data = features.as_slice().to_vec();
        Ok(tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), data)?.into())
    }

    fn run(&self, features: &FeatureVector) -> TractResult<TVec<TValue>> {
        let input = Self::features_to_tensor(features)?;
        self.model.run(tvec!(input.into()))
    }
}

fn invocation_failure(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::ClassifierInvocationFailure(e.to_string())
}

/// Single class value from the label output
fn label_from(outputs: &[TValue]) -> PipelineResult<i64> {
    let label = outputs
        .first()
        .ok_or_else(|| invocation_failure("no output from model"))?;
    let label = label.cast_to::<i64>().map_err(invocation_failure)?;
    let values = label.as_slice::<i64>().map_err(invocation_failure)?;
    match values {
        [class] => Ok(*class),
        other => Err(invocation_failure(format!(
            "label output has {} values, expected 1",
            other.len()
        ))),
    }
}

/// Class distribution from the probability output
fn probabilities_from(outputs: &[TValue]) -> PipelineResult<Vec<f32>> {
    let probs = outputs
        .get(1)
        .ok_or_else(|| invocation_failure("model has no probability output"))?;
    let probs = probs.cast_to::<f32>().map_err(invocation_failure)?;
    let values = probs.as_slice::<f32>().map_err(invocation_failure)?;
    if values.len() != ONNX_CLASSES.len() {
        return Err(invocation_failure(format!(
            "probability output has {} values, expected {}",
            values.len(),
            ONNX_CLASSES.len()
        )));
    }
    Ok(values.to_vec())
}

impl ClassWiseClassifier for OnnxClassifier {
    fn predict(&self, features: &FeatureVector) -> PipelineResult<i64> {
        let outputs = self.run(features).map_err(invocation_failure)?;
        label_from(&outputs)
    }

    fn format(&self) -> ClassifierFormat {
        ClassifierFormat::Onnx
    }
}

impl ProbabilisticClassifier for OnnxClassifier {
    fn predict_proba(&self, features: &FeatureVector) -> PipelineResult<Vec<f32>> {
        let outputs = self.run(features).map_err(invocation_failure)?;
        probabilities_from(&outputs)
    }

    /// Both outputs come from one run of the graph
    fn predict_with_proba(&self, features: &FeatureVector) -> PipelineResult<(i64, Vec<f32>)> {
        let outputs = self.run(features).map_err(invocation_failure)?;
        Ok((label_from(&outputs)?, probabilities_from(&outputs)?))
    }

    fn classes(&self) -> &[i64] {
        &ONNX_CLASSES
    }
}

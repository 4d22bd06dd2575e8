//! Native tree-ensemble classifier
//!
//! Reads a random forest exported as JSON: a list of trees, each a flat node
//! array where node 0 is the root and children always come after their
//! parent. Splits route `x[feature] <= threshold` to the left child.

use super::classifier::{
    ClassWiseClassifier, Classifier, ClassifierFormat, ProbabilisticClassifier,
};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{FeatureVector, NUM_FEATURES};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// One node of a fitted decision tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    /// Leaf carrying a class distribution (counts or probabilities)
    Leaf { value: Vec<f32> },
    /// Leaf carrying only a hard vote, as an index into `classes`
    Vote { class: usize },
}

#[derive(Debug, Deserialize)]
struct ForestDocument {
    n_features: usize,
    classes: Vec<i64>,
    trees: Vec<TreeDocument>,
}

#[derive(Debug, Deserialize)]
struct TreeDocument {
    nodes: Vec<TreeNode>,
}

/// Random forest evaluated in-process
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    classes: Vec<i64>,
    trees: Vec<Vec<TreeNode>>,
    hard_voting: bool,
}

impl ForestClassifier {
    /// Parse and validate a forest document
    pub fn from_json(bytes: &[u8], path: &Path) -> PipelineResult<Self> {
        let doc: ForestDocument = serde_json::from_slice(bytes)
            .map_err(|e| PipelineError::corrupt(path, format!("invalid forest JSON: {}", e)))?;
        Self::from_document(doc).map_err(|reason| PipelineError::corrupt(path, reason))
    }

    fn from_document(doc: ForestDocument) -> Result<Self, String> {
        if doc.n_features != NUM_FEATURES {
            return Err(format!(
                "forest expects {} features, pipeline provides {}",
                doc.n_features, NUM_FEATURES
            ));
        }
        if doc.classes.len() < 2 {
            return Err(format!("forest has {} classes, need at least 2", doc.classes.len()));
        }
        let unique: HashSet<i64> = doc.classes.iter().copied().collect();
        if unique.len() != doc.classes.len() {
            return Err("forest classes contain duplicates".to_string());
        }
        if doc.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }

        let n_classes = doc.classes.len();
        let mut hard_voting = false;
        let mut trees = Vec::with_capacity(doc.trees.len());
        for (t, tree) in doc.trees.into_iter().enumerate() {
            let mut nodes = tree.nodes;
            if nodes.is_empty() {
                return Err(format!("tree {} has no nodes", t));
            }
            let len = nodes.len();
            for (i, node) in nodes.iter_mut().enumerate() {
                match node {
                    TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if *feature >= NUM_FEATURES {
                            return Err(format!("tree {} node {} splits on feature {}", t, i, feature));
                        }
                        if !threshold.is_finite() {
                            return Err(format!("tree {} node {} has a non-finite threshold", t, i));
                        }
                        for child in [*left, *right] {
                            if child <= i || child >= len {
                                return Err(format!(
                                    "tree {} node {} has child {} outside ({}, {})",
                                    t, i, child, i, len
                                ));
                            }
                        }
                    }
                    TreeNode::Leaf { value } => {
                        if value.len() != n_classes {
                            return Err(format!(
                                "tree {} leaf {} has {} values for {} classes",
                                t,
                                i,
                                value.len(),
                                n_classes
                            ));
                        }
                        if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                            return Err(format!("tree {} leaf {} has invalid values", t, i));
                        }
                        let total: f32 = value.iter().sum();
                        if total <= 0.0 {
                            return Err(format!("tree {} leaf {} is empty", t, i));
                        }
                        value.iter_mut().for_each(|v| *v /= total);
                    }
                    TreeNode::Vote { class } => {
                        if *class >= n_classes {
                            return Err(format!("tree {} leaf {} votes for class {}", t, i, class));
                        }
                        hard_voting = true;
                    }
                }
            }
            trees.push(nodes);
        }

        debug!(
            trees = trees.len(),
            classes = n_classes,
            hard_voting = hard_voting,
            "Parsed forest classifier"
        );

        Ok(Self {
            classes: doc.classes,
            trees,
            hard_voting,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// True when at least one leaf only votes, so no distribution is available
    pub fn is_hard_voting(&self) -> bool {
        self.hard_voting
    }

    /// Wrap in the capability variant this forest supports
    pub fn into_classifier(self) -> Classifier {
        if self.hard_voting {
            Classifier::ClassWise(Box::new(self))
        } else {
            Classifier::Probabilistic(Box::new(self))
        }
    }

    fn leaf<'a>(tree: &'a [TreeNode], features: &FeatureVector) -> &'a TreeNode {
        let x = features.as_slice();
        let mut idx = 0;
        loop {
            match &tree[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                leaf => return leaf,
            }
        }
    }

    fn average_distribution(&self, features: &FeatureVector) -> Vec<f32> {
        let mut sum = vec![0.0f32; self.classes.len()];
        for tree in &self.trees {
            if let TreeNode::Leaf { value } = Self::leaf(tree, features) {
                sum.iter_mut().zip(value).for_each(|(s, v)| *s += v);
            }
        }
        let n = self.trees.len() as f32;
        sum.iter_mut().for_each(|s| *s /= n);
        sum
    }

    fn vote_counts(&self, features: &FeatureVector) -> Vec<f32> {
        let mut counts = vec![0.0f32; self.classes.len()];
        for tree in &self.trees {
            let class = match Self::leaf(tree, features) {
                TreeNode::Vote { class } => *class,
                TreeNode::Leaf { value } => argmax(value),
                TreeNode::Split { .. } => unreachable!("leaf() only returns leaves"),
            };
            counts[class] += 1.0;
        }
        counts
    }
}

/// Index of the first maximum
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

impl ClassWiseClassifier for ForestClassifier {
    fn predict(&self, features: &FeatureVector) -> PipelineResult<i64> {
        let scores = if self.hard_voting {
            self.vote_counts(features)
        } else {
            self.average_distribution(features)
        };
        Ok(self.classes[argmax(&scores)])
    }

    fn format(&self) -> ClassifierFormat {
        ClassifierFormat::Forest
    }
}

impl ProbabilisticClassifier for ForestClassifier {
    fn predict_proba(&self, features: &FeatureVector) -> PipelineResult<Vec<f32>> {
        if self.hard_voting {
            return Err(PipelineError::ClassifierInvocationFailure(
                "forest leaves carry votes only, no distribution".to_string(),
            ));
        }
        Ok(self.average_distribution(features))
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureVector;

    fn vector(t: f32, h: f32, w: f32) -> FeatureVector {
        FeatureVector::from_ordered([t, h, w])
    }

    fn parse(json: &str) -> PipelineResult<ForestClassifier> {
        ForestClassifier::from_json(json.as_bytes(), Path::new("forest.json"))
    }

    const STUMP: &str = r#"{
        "n_features": 3,
        "classes": [0, 1],
        "trees": [
            {"nodes": [
                {"feature": 0, "threshold": 0.5, "left": 1, "right": 2},
                {"value": [8.0, 2.0]},
                {"value": [1.0, 3.0]}
            ]}
        ]
    }"#;

    #[test]
    fn test_stump_routes_on_threshold() {
        let forest = parse(STUMP).unwrap();
        assert!(!forest.is_hard_voting());
        assert_eq!(forest.predict(&vector(0.5, 0.0, 0.0)).unwrap(), 0);
        assert_eq!(forest.predict(&vector(0.51, 0.0, 0.0)).unwrap(), 1);
    }

    #[test]
    fn test_leaf_counts_are_normalized() {
        let forest = parse(STUMP).unwrap();
        let proba = forest.predict_proba(&vector(0.1, 0.0, 0.0)).unwrap();
        assert!((proba[0] - 0.8).abs() < 1e-6);
        assert!((proba[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_hard_voting_majority() {
        let forest = parse(
            r#"{
            "n_features": 3,
            "classes": [0, 1],
            "trees": [
                {"nodes": [{"class": 1}]},
                {"nodes": [{"class": 1}]},
                {"nodes": [{"class": 0}]}
            ]
        }"#,
        )
        .unwrap();
        assert!(forest.is_hard_voting());
        assert_eq!(forest.predict(&vector(0.0, 0.0, 0.0)).unwrap(), 1);
        assert!(forest.predict_proba(&vector(0.0, 0.0, 0.0)).is_err());

        let classifier = forest.into_classifier();
        assert!(!classifier.supports_probabilities());
    }

    #[test]
    fn test_vote_tie_prefers_lowest_class() {
        let forest = parse(
            r#"{"n_features": 3, "classes": [0, 1],
                "trees": [{"nodes": [{"class": 1}]}, {"nodes": [{"class": 0}]}]}"#,
        )
        .unwrap();
        assert_eq!(forest.predict(&vector(0.0, 0.0, 0.0)).unwrap(), 0);
    }

    #[test]
    fn test_rejects_wrong_feature_count() {
        let err = parse(r#"{"n_features": 4, "classes": [0, 1], "trees": [{"nodes": [{"class": 0}]}]}"#)
            .unwrap_err();
        assert_eq!(err.kind(), "artifact_corrupt");
    }

    #[test]
    fn test_rejects_backward_child() {
        let err = parse(
            r#"{"n_features": 3, "classes": [0, 1], "trees": [{"nodes": [
                {"feature": 0, "threshold": 0.5, "left": 0, "right": 1},
                {"class": 0}
            ]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("child 0"));
    }

    #[test]
    fn test_rejects_short_distribution() {
        let err = parse(
            r#"{"n_features": 3, "classes": [0, 1], "trees": [{"nodes": [{"value": [1.0]}]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("1 values for 2 classes"));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = parse("{ not json").unwrap_err();
        assert_eq!(err.kind(), "artifact_corrupt");
    }
}

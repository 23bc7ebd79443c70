//! Gradient-boosted tree ensembles loaded from JSON
//!
//! File format:
//!
//! ```json
//! {
//!   "trees": [{"nodes": [
//!     {"feature": 5, "threshold": 300.0, "left": 1, "right": 2},
//!     {"value": 0.8},
//!     {"value": 0.2}
//!   ]}],
//!   "base_score": 0.0,
//!   "learning_rate": 1.0
//! }
//! ```
//!
//! Splits send `x < threshold` left. Child indices must point forward, which
//! makes every traversal finite.

use serde::Deserialize;

use super::{HabitabilityModel, ModelOutput, ModelUnavailableError};

/// One tree node
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn validate(&self, tree_idx: usize, n_features: usize) -> Result<(), ModelUnavailableError> {
        let invalid = |msg: String| ModelUnavailableError::Invalid(format!("tree {}: {}", tree_idx, msg));
        if self.nodes.is_empty() {
            return Err(invalid("no nodes".to_string()));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(invalid(format!(
                            "node {} splits on feature {} but the model has {} features",
                            idx, feature, n_features
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(format!("node {} has a non-finite threshold", idx)));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(invalid(format!("node {} has invalid child {}", idx, child)));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(invalid(format!("node {} has a non-finite leaf", idx)));
                    }
                }
            }
        }
        Ok(())
    }

    /// Leaf value reached by `features`
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] < *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Tree ensemble as stored on disk
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TreeEnsemble {
    pub trees: Vec<Tree>,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
}

fn default_learning_rate() -> f64 {
    1.0
}

impl TreeEnsemble {
    /// Parse and validate against the model's feature count
    pub fn from_json(json: &str, n_features: usize) -> Result<Self, ModelUnavailableError> {
        let ensemble: TreeEnsemble = serde_json::from_str(json)
            .map_err(|e| ModelUnavailableError::Invalid(format!("ensemble JSON: {}", e)))?;
        ensemble.validate(n_features)?;
        Ok(ensemble)
    }

    pub fn validate(&self, n_features: usize) -> Result<(), ModelUnavailableError> {
        if self.trees.is_empty() {
            return Err(ModelUnavailableError::Invalid("ensemble has no trees".to_string()));
        }
        if !self.base_score.is_finite() || !self.learning_rate.is_finite() {
            return Err(ModelUnavailableError::Invalid(
                "ensemble base_score/learning_rate must be finite".to_string(),
            ));
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(idx, n_features)?;
        }
        Ok(())
    }

    fn tree_outputs(&self, features: &[f64]) -> Vec<f64> {
        self.trees.iter().map(|t| t.evaluate(features)).collect()
    }
}

/// Averaging regressor
///
/// Confidence is one minus the normalised spread of per-tree outputs, a
/// variance proxy: trees that agree give high confidence.
#[derive(Debug, Clone)]
pub struct TreeRegressor {
    ensemble: TreeEnsemble,
}

impl TreeRegressor {
    pub fn new(ensemble: TreeEnsemble) -> Self {
        Self { ensemble }
    }
}

impl HabitabilityModel for TreeRegressor {
    fn predict(&self, features: &[f64]) -> ModelOutput {
        let outputs = self.ensemble.tree_outputs(features);
        let n = outputs.len() as f64;
        let mean = outputs.iter().sum::<f64>() / n;
        let variance = outputs.iter().map(|o| (o - mean).powi(2)).sum::<f64>() / n;
        let value = self.ensemble.base_score + self.ensemble.learning_rate * mean;
        // Outputs live in [0, 1], so the spread is at most 0.5
        let spread = (variance.sqrt() * self.ensemble.learning_rate.abs() / 0.5).min(1.0);
        ModelOutput {
            value: value.clamp(0.0, 1.0),
            confidence: (1.0 - spread).clamp(0.0, 1.0),
        }
    }
}

/// Boosted binary classifier: logistic of the summed margins
///
/// Confidence is the distance from the decision boundary, `|2p - 1|`.
#[derive(Debug, Clone)]
pub struct TreeClassifier {
    ensemble: TreeEnsemble,
}

impl TreeClassifier {
    pub fn new(ensemble: TreeEnsemble) -> Self {
        Self { ensemble }
    }
}

impl HabitabilityModel for TreeClassifier {
    fn predict(&self, features: &[f64]) -> ModelOutput {
        let margin = self.ensemble.base_score
            + self.ensemble.learning_rate * self.ensemble.tree_outputs(features).iter().sum::<f64>();
        let probability = 1.0 / (1.0 + (-margin).exp());
        ModelOutput {
            value: probability,
            confidence: (2.0 * probability - 1.0).abs(),
        }
    }
}

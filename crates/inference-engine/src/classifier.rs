//! Classifier Runtimes
//!
//! Evaluate pre-trained binary classifiers on an already-transformed row.
//! Index 1 of the returned pair is the "maintenance needed" class.

use crate::InferenceError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use tract_onnx::prelude::*;

/// Binary classifier exposing `predict_proba`
pub trait Classifier: Send + Sync {
    /// Short model family name for logs and health output
    fn name(&self) -> &'static str;

    /// Width of the transformed row the classifier expects
    fn n_features(&self) -> usize;

    /// Class probabilities `[p(no maintenance), p(maintenance)]`
    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], InferenceError>;
}

fn check_row(expected: usize, row: &[f64]) -> Result<(), InferenceError> {
    if row.len() != expected {
        return Err(InferenceError::InvalidInputShape {
            expected,
            actual: row.len(),
        });
    }
    Ok(())
}

/// Fitted CART tree in scikit-learn's flat array layout. Leaves have
/// `children_left == children_right == -1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub n_features: usize,
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (counts or fractions)
    pub value: Vec<[f64; 2]>,
}

impl DecisionTree {
    /// Check array lengths and node links. Children must come after their
    /// parent, so traversal always terminates.
    pub fn validate(&self) -> Result<(), InferenceError> {
        let n = self.children_left.len();
        if n == 0 {
            return Err(InferenceError::ModelLoadError("decision tree has no nodes".to_string()));
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|len| *len != n)
        {
            return Err(InferenceError::ModelLoadError(
                "decision tree arrays have different lengths".to_string(),
            ));
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == -1 && right == -1 {
                if self.value[node].iter().sum::<f64>() <= 0.0 {
                    return Err(InferenceError::ModelLoadError(format!(
                        "leaf {} has no class weight",
                        node
                    )));
                }
                continue;
            }

            let in_range = |child: i64| child > node as i64 && (child as usize) < n;
            if !in_range(left) || !in_range(right) {
                return Err(InferenceError::ModelLoadError(format!(
                    "node {} has invalid children ({}, {})",
                    node, left, right
                )));
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= self.n_features {
                return Err(InferenceError::ModelLoadError(format!(
                    "node {} splits on feature {} of {}",
                    node, feature, self.n_features
                )));
            }
        }
        Ok(())
    }

    /// Index of the leaf reached by `row`
    fn leaf(&self, row: &[f64]) -> usize {
        let mut node = 0;
        while self.children_left[node] != -1 {
            let feature = self.feature[node] as usize;
            node = if row[feature] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        node
    }
}

impl Classifier for DecisionTree {
    fn name(&self) -> &'static str {
        "decision_tree"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], InferenceError> {
        check_row(self.n_features, row)?;
        let leaf = self.leaf(row);
        let [a, b] = self.value[leaf];
        let total = a + b;
        debug!("Decision tree reached leaf {}", leaf);
        Ok([a / total, b / total])
    }
}

/// Ensemble of trees with averaged probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn validate(&self) -> Result<(), InferenceError> {
        let first = self
            .trees
            .first()
            .ok_or_else(|| InferenceError::ModelLoadError("random forest has no trees".to_string()))?;
        for (i, tree) in self.trees.iter().enumerate() {
            if tree.n_features != first.n_features {
                return Err(InferenceError::ModelLoadError(format!(
                    "tree {} expects {} features, tree 0 expects {}",
                    i, tree.n_features, first.n_features
                )));
            }
            tree.validate()?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn n_features(&self) -> usize {
        self.trees.first().map_or(0, |t| t.n_features)
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], InferenceError> {
        let mut sum = [0.0, 0.0];
        for tree in &self.trees {
            let [a, b] = tree.predict_proba(row)?;
            sum[0] += a;
            sum[1] += b;
        }
        let n = self.trees.len() as f64;
        Ok([sum[0] / n, sum[1] / n])
    }
}

/// Binary logistic regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LogisticModel {
    fn name(&self) -> &'static str {
        "logistic"
    }

    fn n_features(&self) -> usize {
        self.coef.len()
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], InferenceError> {
        check_row(self.coef.len(), row)?;
        let z = self.intercept + self.coef.iter().zip(row).map(|(w, x)| w * x).sum::<f64>();
        let p = sigmoid(z);
        Ok([1.0 - p, p])
    }
}

/// ONNX classifier run with tract. The graph takes one `f32[1, n]` input and
/// exposes class probabilities as a plain tensor (no ZipMap).
pub struct OnnxClassifier {
    plan: TypedRunnableModel<TypedModel>,
    n_features: usize,
    probability_output: usize,
}

impl OnnxClassifier {
    /// Load and optimize the graph for a fixed `[1, n_features]` input
    pub fn load(
        path: &Path,
        n_features: usize,
        probability_output: usize,
    ) -> Result<Self, InferenceError> {
        info!("Loading ONNX classifier from {}", path.display());

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, n_features]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| {
                InferenceError::ModelLoadError(format!("{}: {}", path.display(), e))
            })?;

        Ok(Self {
            plan,
            n_features,
            probability_output,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], InferenceError> {
        check_row(self.n_features, row)?;
        let data: Vec<f32> = row.iter().map(|v| *v as f32).collect();

        let input = Tensor::from_shape(&[1, self.n_features], &data)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let probs = outputs
            .get(self.probability_output)
            .ok_or_else(|| {
                InferenceError::InferenceFailed(format!(
                    "model has {} outputs, probability output is #{}",
                    outputs.len(),
                    self.probability_output
                ))
            })?
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let values: Vec<f64> = probs.iter().map(|p| *p as f64).collect();
        match values.as_slice() {
            [p0, p1] => Ok([*p0, *p1]),
            other => Err(InferenceError::InferenceFailed(format!(
                "expected 2 class probabilities, got {}",
                other.len()
            ))),
        }
    }
}

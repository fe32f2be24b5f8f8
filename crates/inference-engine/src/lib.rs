//! Maintenance Risk Inference
//!
//! Loads a pre-fitted model artifact once and runs the four preprocessing
//! stages plus the classifier's `predict_proba` on a single feature record.

mod artifact;
mod classifier;
mod engine;
mod stages;

pub use artifact::{ClassifierSpec, ModelArtifact, Preprocessor};
pub use classifier::{Classifier, DecisionTree, LogisticModel, OnnxClassifier, RandomForest};
pub use engine::{InferenceEngine, InferenceResult};
pub use stages::{
    CategoricalImputer, CategoricalStrategy, HandleUnknown, NumericImputer, NumericStrategy,
    OneHotEncoder, StageError, StandardScaler, Transform,
};

use thiserror::Error;

/// Errors during model loading or inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: usize, actual: usize },
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("Unknown category {value:?} for column {column}")]
    UnknownCategory { column: String, value: String },
    #[error("Classifier returned invalid probability {0}")]
    InvalidProbability(f64),
    #[error("Cannot fit {stage}: {reason}")]
    FitError { stage: &'static str, reason: String },
}

//! Inference Engine Implementation

use crate::artifact::{ClassifierSpec, ModelArtifact, Preprocessor};
use crate::classifier::{Classifier, OnnxClassifier};
use crate::InferenceError;
use feature_engine::{FeatureRecord, FeatureSet};
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Result of inference operation
#[derive(Debug, Clone, Serialize)]
pub struct InferenceResult {
    /// Probability of the "maintenance needed" class
    pub probability: f64,
    /// Both class probabilities as returned by the classifier
    pub probabilities: [f64; 2],
    /// Time spent in preprocessing and classification
    #[serde(skip)]
    pub latency: Duration,
}

/// Load-once model runtime. Immutable after construction, so one instance
/// can be shared across request handlers.
pub struct InferenceEngine {
    name: String,
    feature_set: FeatureSet,
    preprocessor: Preprocessor,
    classifier: Box<dyn Classifier>,
}

impl InferenceEngine {
    /// Load an artifact file and build the runtime
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let artifact = ModelArtifact::load(path)?;
        Self::from_artifact(artifact)
    }

    /// Build the runtime from an already parsed artifact
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, InferenceError> {
        artifact.validate()?;
        let ModelArtifact {
            name,
            feature_set,
            preprocessor,
            classifier,
        } = artifact;

        let width = preprocessor.output_width();
        let classifier: Box<dyn Classifier> = match classifier {
            ClassifierSpec::DecisionTree(tree) => Box::new(tree),
            ClassifierSpec::RandomForest(forest) => Box::new(forest),
            ClassifierSpec::Logistic(model) => Box::new(model),
            ClassifierSpec::Onnx {
                path,
                probability_output,
            } => Box::new(OnnxClassifier::load(&path, width, probability_output)?),
        };

        info!(
            "Model {} ready: {} classifier, {} feature set, {} model inputs",
            name,
            classifier.name(),
            feature_set.as_str(),
            width
        );

        Ok(Self {
            name,
            feature_set,
            preprocessor,
            classifier,
        })
    }

    /// Run preprocessing and `predict_proba` on one record
    pub fn predict(&self, record: &FeatureRecord) -> Result<InferenceResult, InferenceError> {
        let start = Instant::now();

        let row = self.preprocessor.transform(record)?;
        let probabilities = self.classifier.predict_proba(&row)?;
        let probability = probabilities[1];

        if !(0.0..=1.0).contains(&probability) {
            return Err(InferenceError::InvalidProbability(probability));
        }

        let latency = start.elapsed();
        debug!(
            "Inference completed in {:?}: p(maintenance)={:.4}",
            latency, probability
        );

        Ok(InferenceResult {
            probability,
            probabilities,
            latency,
        })
    }

    /// Model name from the artifact, or its file stem
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Feature set the model was trained on
    pub fn feature_set(&self) -> FeatureSet {
        self.feature_set
    }

    /// Classifier family
    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }
}

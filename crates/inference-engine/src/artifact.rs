//! Model Artifact
//!
//! JSON bundle holding the fitted preprocessing stages and the classifier.
//! The transformed row is laid out as scaled numeric columns, then the
//! one-hot block of each categorical column, then passthrough columns.

use crate::classifier::{Classifier, DecisionTree, LogisticModel, RandomForest};
use crate::stages::{
    CategoricalImputer, CategoricalStrategy, HandleUnknown, NumericImputer, NumericStrategy,
    OneHotEncoder, StageError, StandardScaler, Transform,
};
use crate::InferenceError;
use feature_engine::{columns, Cell, FeatureRecord, FeatureSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn default_probability_output() -> usize {
    1
}

/// Classifier section of the artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    Logistic(LogisticModel),
    /// External ONNX graph, resolved relative to the artifact file
    Onnx {
        path: PathBuf,
        #[serde(default = "default_probability_output")]
        probability_output: usize,
    },
}

impl ClassifierSpec {
    /// Width of the input row, when known without loading anything
    fn n_features(&self) -> Option<usize> {
        match self {
            ClassifierSpec::DecisionTree(tree) => Some(tree.n_features()),
            ClassifierSpec::RandomForest(forest) => Some(forest.n_features()),
            ClassifierSpec::Logistic(model) => Some(model.n_features()),
            ClassifierSpec::Onnx { .. } => None,
        }
    }
}

/// The four fitted preprocessing stages and the columns they read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    #[serde(default)]
    pub passthrough_columns: Vec<String>,
    pub numeric_imputer: NumericImputer,
    pub scaler: StandardScaler,
    pub categorical_imputer: CategoricalImputer,
    pub encoder: OneHotEncoder,
}

impl Preprocessor {
    /// Fit all four stages from training records: median imputation and
    /// standard scaling for numeric columns, most-frequent imputation and
    /// one-hot encoding (unknowns ignored) for categorical columns.
    pub fn fit(
        records: &[FeatureRecord],
        numeric_columns: &[&str],
        categorical_columns: &[&str],
        passthrough_columns: &[&str],
    ) -> Result<Self, InferenceError> {
        let numeric_columns = owned(numeric_columns);
        let categorical_columns = owned(categorical_columns);

        let numeric_rows = records
            .iter()
            .map(|r| numeric_block(r, &numeric_columns))
            .collect::<Result<Vec<_>, _>>()?;
        let numeric_imputer = NumericImputer::fit(NumericStrategy::Median, &numeric_rows, 0.0)?;
        let imputed = numeric_rows
            .iter()
            .map(|row| numeric_imputer.transform(row))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| stage_error(e, &numeric_columns))?;
        let scaler = StandardScaler::fit(&imputed)?;

        let categorical_rows = records
            .iter()
            .map(|r| categorical_block(r, &categorical_columns))
            .collect::<Result<Vec<_>, _>>()?;
        let categorical_imputer =
            CategoricalImputer::fit(CategoricalStrategy::MostFrequent, &categorical_rows, "missing")?;
        let filled = categorical_rows
            .iter()
            .map(|row| categorical_imputer.transform(row))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| stage_error(e, &categorical_columns))?;
        let encoder = OneHotEncoder::fit(&filled, HandleUnknown::Ignore)?;

        Ok(Self {
            numeric_columns,
            categorical_columns,
            passthrough_columns: owned(passthrough_columns),
            numeric_imputer,
            scaler,
            categorical_imputer,
            encoder,
        })
    }

    /// Width of the transformed row
    pub fn output_width(&self) -> usize {
        self.numeric_columns.len() + self.encoder.width() + self.passthrough_columns.len()
    }

    /// Run numeric imputation, scaling, categorical imputation and encoding
    pub fn transform(&self, record: &FeatureRecord) -> Result<Vec<f64>, InferenceError> {
        let mut row = Vec::with_capacity(self.output_width());

        let numeric = numeric_block(record, &self.numeric_columns)?;
        let imputed = self
            .numeric_imputer
            .transform(&numeric)
            .map_err(|e| stage_error(e, &self.numeric_columns))?;
        let scaled = self
            .scaler
            .transform(&imputed)
            .map_err(|e| stage_error(e, &self.numeric_columns))?;
        row.extend(scaled);

        let categorical = categorical_block(record, &self.categorical_columns)?;
        let filled = self
            .categorical_imputer
            .transform(&categorical)
            .map_err(|e| stage_error(e, &self.categorical_columns))?;
        let encoded = self
            .encoder
            .transform(&filled)
            .map_err(|e| stage_error(e, &self.categorical_columns))?;
        row.extend(encoded);

        for column in &self.passthrough_columns {
            match lookup(record, column)? {
                Cell::Number(v) => row.push(*v),
                other => {
                    return Err(InferenceError::SchemaMismatch(format!(
                        "passthrough column {} needs a number, got {:?}",
                        column, other
                    )))
                }
            }
        }

        debug!("Transformed record into {} model inputs", row.len());
        Ok(row)
    }

    fn validate(&self, feature_set: FeatureSet) -> Result<(), InferenceError> {
        let known: HashSet<&str> = feature_set.columns().iter().copied().collect();
        let mut seen = HashSet::new();
        for column in self
            .numeric_columns
            .iter()
            .chain(&self.categorical_columns)
            .chain(&self.passthrough_columns)
        {
            if !known.contains(column.as_str()) {
                return Err(InferenceError::SchemaMismatch(format!(
                    "artifact column {} is not part of the {} feature set",
                    column,
                    feature_set.as_str()
                )));
            }
            if !seen.insert(column.as_str()) {
                return Err(InferenceError::SchemaMismatch(format!(
                    "column {} is used by more than one stage",
                    column
                )));
            }
        }

        if let Some(column) = self
            .passthrough_columns
            .iter()
            .find(|c| columns::OPTIONAL.contains(&c.as_str()))
        {
            return Err(InferenceError::SchemaMismatch(format!(
                "optional column {} cannot be passed through; it needs the numeric imputer",
                column
            )));
        }

        let numeric = self.numeric_columns.len();
        let categorical = self.categorical_columns.len();
        for (stage, width, expected) in [
            ("numeric imputer", self.numeric_imputer.n_features_in(), numeric),
            ("scaler", self.scaler.n_features_in(), numeric),
            ("categorical imputer", self.categorical_imputer.n_features_in(), categorical),
            ("encoder", self.encoder.n_features_in(), categorical),
        ] {
            if width != expected {
                return Err(InferenceError::SchemaMismatch(format!(
                    "{} was fitted on {} columns, artifact lists {}",
                    stage, width, expected
                )));
            }
        }
        if self.scaler.scale.len() != numeric {
            return Err(InferenceError::SchemaMismatch(
                "scaler mean and scale lengths differ".to_string(),
            ));
        }
        Ok(())
    }
}

fn owned(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

fn lookup<'a>(record: &'a FeatureRecord, column: &str) -> Result<&'a Cell, InferenceError> {
    record.get(column).ok_or_else(|| {
        InferenceError::SchemaMismatch(format!(
            "{} record has no column {}",
            record.feature_set().as_str(),
            column
        ))
    })
}

fn numeric_block(record: &FeatureRecord, columns: &[String]) -> Result<Vec<Option<f64>>, InferenceError> {
    columns
        .iter()
        .map(|column| match lookup(record, column)? {
            Cell::Number(v) => Ok(Some(*v)),
            Cell::Missing => Ok(None),
            Cell::Category(c) => Err(InferenceError::SchemaMismatch(format!(
                "numeric column {} holds category {:?}",
                column, c
            ))),
        })
        .collect()
}

fn categorical_block(
    record: &FeatureRecord,
    columns: &[String],
) -> Result<Vec<Option<String>>, InferenceError> {
    columns
        .iter()
        .map(|column| match lookup(record, column)? {
            Cell::Category(c) => Ok(Some(c.clone())),
            Cell::Missing => Ok(None),
            Cell::Number(v) => Err(InferenceError::SchemaMismatch(format!(
                "categorical column {} holds number {}",
                column, v
            ))),
        })
        .collect()
}

fn stage_error(err: StageError, columns: &[String]) -> InferenceError {
    match err {
        StageError::Width { expected, actual } => {
            InferenceError::InvalidInputShape { expected, actual }
        }
        StageError::UnknownCategory(idx, value) => InferenceError::UnknownCategory {
            column: columns.get(idx).cloned().unwrap_or_else(|| idx.to_string()),
            value,
        },
    }
}

/// Serialized, fitted pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default)]
    pub name: String,
    pub feature_set: FeatureSet,
    #[serde(flatten)]
    pub preprocessor: Preprocessor,
    pub classifier: ClassifierSpec,
}

impl ModelArtifact {
    /// Read and validate an artifact file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        info!("Loading model artifact from {}", path.display());

        let json = std::fs::read_to_string(path)
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {}", path.display(), e)))?;
        let mut artifact = Self::from_json(&json)?;

        if let ClassifierSpec::Onnx { path: onnx, .. } = &mut artifact.classifier {
            if onnx.is_relative() {
                if let Some(dir) = path.parent() {
                    *onnx = dir.join(&*onnx);
                }
            }
        }

        if artifact.name.is_empty() {
            artifact.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(artifact)
    }

    /// Parse and validate an artifact from JSON text
    pub fn from_json(json: &str) -> Result<Self, InferenceError> {
        let artifact: Self = serde_json::from_str(json)
            .map_err(|e| InferenceError::ModelLoadError(format!("invalid artifact: {}", e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Check that stages, columns and classifier agree with each other
    pub fn validate(&self) -> Result<(), InferenceError> {
        self.preprocessor.validate(self.feature_set)?;

        match &self.classifier {
            ClassifierSpec::DecisionTree(tree) => tree.validate()?,
            ClassifierSpec::RandomForest(forest) => forest.validate()?,
            ClassifierSpec::Logistic(_) | ClassifierSpec::Onnx { .. } => {}
        }

        let width = self.preprocessor.output_width();
        if let Some(n) = self.classifier.n_features() {
            if n != width {
                return Err(InferenceError::SchemaMismatch(format!(
                    "classifier expects {} inputs, preprocessing produces {}",
                    n, width
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_engine::{assemble, BrakeCondition, VehicleReading, VehicleType};

    const ARTIFACT: &str = r#"{
        "name": "test-logistic",
        "feature_set": "core",
        "numeric_columns": ["Usage_Hours", "Oil_Quality"],
        "categorical_columns": ["Vehicle_Type"],
        "passthrough_columns": ["Failure_History"],
        "numeric_imputer": {"strategy": "median", "statistics": [4000.0, 80.0]},
        "scaler": {"mean": [5000.0, 80.0], "scale": [1000.0, 10.0]},
        "categorical_imputer": {"strategy": "most_frequent", "statistics": ["Truck"]},
        "encoder": {"categories": [["Truck", "Van"]], "handle_unknown": "error"},
        "classifier": {"kind": "logistic", "coef": [1.0, -1.0, 0.0, 0.5, 2.0], "intercept": 0.0}
    }"#;

    #[test]
    fn test_parse_and_transform() {
        let artifact = ModelArtifact::from_json(ARTIFACT).unwrap();
        assert_eq!(artifact.preprocessor.output_width(), 5);

        let reading = VehicleReading {
            usage_hours: 7000.0,
            oil_quality: 60.0,
            vehicle_type: VehicleType::Van,
            ..Default::default()
        };
        let row = artifact
            .preprocessor
            .transform(&assemble(&reading, FeatureSet::Core))
            .unwrap();
        assert_eq!(row, vec![2.0, -2.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_missing_numeric_is_imputed_before_scaling() {
        let artifact = ModelArtifact::from_json(ARTIFACT).unwrap();
        let reading = VehicleReading {
            usage_hours: f64::NAN,
            ..Default::default()
        };
        let row = artifact
            .preprocessor
            .transform(&assemble(&reading, FeatureSet::Core))
            .unwrap();
        // median 4000 scaled: (4000 - 5000) / 1000
        assert_eq!(row[0], -1.0);
    }

    #[test]
    fn test_rejects_unknown_column() {
        let json = ARTIFACT.replace("\"Oil_Quality\"]", "\"Battery_Voltage\"]");
        let err = ModelArtifact::from_json(&json).unwrap_err();
        assert!(matches!(err, InferenceError::SchemaMismatch(_)));
    }

    #[test]
    fn test_rejects_classifier_width_mismatch() {
        let json = ARTIFACT.replace("[1.0, -1.0, 0.0, 0.5, 2.0]", "[1.0, -1.0]");
        let err = ModelArtifact::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("classifier expects 2 inputs"));
    }

    #[test]
    fn test_rejects_stage_width_mismatch() {
        let json = ARTIFACT.replace("[4000.0, 80.0]", "[4000.0]");
        assert!(ModelArtifact::from_json(&json).is_err());
    }

    #[test]
    fn test_fit_preprocessor_from_records() {
        let records: Vec<_> = [
            (1000.0, VehicleType::Truck, BrakeCondition::Good),
            (3000.0, VehicleType::Van, BrakeCondition::Poor),
            (f64::NAN, VehicleType::Truck, BrakeCondition::Fair),
        ]
        .iter()
        .map(|(usage, vehicle_type, brake_condition)| {
            let reading = VehicleReading {
                usage_hours: *usage,
                vehicle_type: *vehicle_type,
                brake_condition: *brake_condition,
                ..Default::default()
            };
            assemble(&reading, FeatureSet::Core)
        })
        .collect();

        let pre = Preprocessor::fit(
            &records,
            &["Usage_Hours"],
            &["Vehicle_Type", "Brake_Condition"],
            &[],
        )
        .unwrap();

        assert_eq!(pre.numeric_imputer.statistics, vec![2000.0]);
        assert_eq!(pre.scaler.mean, vec![2000.0]);
        assert_eq!(pre.encoder.width(), 5);
        assert_eq!(pre.output_width(), 6);
        assert!(pre.validate(FeatureSet::Core).is_ok());

        let row = pre.transform(&records[1]).unwrap();
        // Van, Poor
        assert_eq!(&row[1..], &[0.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_rejects_optional_passthrough_column() {
        let json = r#"{
            "feature_set": "extended",
            "numeric_columns": ["Usage_Hours"],
            "categorical_columns": [],
            "passthrough_columns": ["Battery_Voltage"],
            "numeric_imputer": {"strategy": "median", "statistics": [5000.0]},
            "scaler": {"mean": [5000.0], "scale": [1000.0]},
            "categorical_imputer": {"strategy": "most_frequent", "statistics": []},
            "encoder": {"categories": []},
            "classifier": {"kind": "logistic", "coef": [1.0, 1.0], "intercept": 0.0}
        }"#;
        let err = ModelArtifact::from_json(json).unwrap_err();
        assert!(matches!(err, InferenceError::SchemaMismatch(_)));
        assert!(err.to_string().contains("Battery_Voltage"));

        // the same column through the imputer is accepted
        let imputed = json
            .replace(r#""passthrough_columns": ["Battery_Voltage"],"#, "")
            .replace(r#"["Usage_Hours"]"#, r#"["Usage_Hours", "Battery_Voltage"]"#)
            .replace("[5000.0]", "[5000.0, 12.6]")
            .replace("[1000.0]", "[1000.0, 1.0]");
        assert!(ModelArtifact::from_json(&imputed).is_ok());
    }
}

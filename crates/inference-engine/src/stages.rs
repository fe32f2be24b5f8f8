//! Preprocessing Stages
//!
//! Fitted column transforms matching the scikit-learn estimators the model
//! artifact is exported from: `SimpleImputer`, `StandardScaler` and
//! `OneHotEncoder`. Each stage works on one row of its own column block.

use crate::InferenceError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Row-level failure inside a stage; column indices are block-relative
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    #[error("expected {expected} columns, got {actual}")]
    Width { expected: usize, actual: usize },
    #[error("unknown category {1:?} in column {0}")]
    UnknownCategory(usize, String),
}

/// A fitted stage mapping one row to another
pub trait Transform {
    type Input;
    type Output;

    /// Number of input columns the stage was fitted on
    fn n_features_in(&self) -> usize;

    fn transform(&self, row: &[Self::Input]) -> Result<Vec<Self::Output>, StageError>;
}

fn check_width(expected: usize, actual: usize) -> Result<(), StageError> {
    if expected == actual {
        Ok(())
    } else {
        Err(StageError::Width { expected, actual })
    }
}

/// Column count of a rectangular training block
fn block_width<T>(stage: &'static str, rows: &[Vec<T>]) -> Result<usize, InferenceError> {
    let width = rows
        .first()
        .map(Vec::len)
        .ok_or_else(|| InferenceError::FitError {
            stage,
            reason: "no rows".to_string(),
        })?;

    if let Some(pos) = rows.iter().position(|r| r.len() != width) {
        return Err(InferenceError::FitError {
            stage,
            reason: format!("row {} has {} columns, expected {}", pos, rows[pos].len(), width),
        });
    }
    Ok(width)
}

// ----------------------------------------------------------------------------
// Numeric imputer
// ----------------------------------------------------------------------------

/// Fill strategy for numeric columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericStrategy {
    Mean,
    Median,
    Constant,
}

/// Replaces missing numeric cells with a per-column statistic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericImputer {
    pub strategy: NumericStrategy,
    /// Fill value per column
    pub statistics: Vec<f64>,
}

impl NumericImputer {
    /// Compute fill values from training rows. `fill_value` is only used
    /// by the constant strategy.
    pub fn fit(
        strategy: NumericStrategy,
        rows: &[Vec<Option<f64>>],
        fill_value: f64,
    ) -> Result<Self, InferenceError> {
        let width = block_width("numeric imputer", rows)?;
        let mut statistics = Vec::with_capacity(width);

        for col in 0..width {
            let stat = match strategy {
                NumericStrategy::Constant => fill_value,
                NumericStrategy::Mean => {
                    let values = observed(rows, col)?;
                    values.iter().sum::<f64>() / values.len() as f64
                }
                NumericStrategy::Median => {
                    let mut values = observed(rows, col)?;
                    values.sort_by(|a, b| a.total_cmp(b));
                    let mid = values.len() / 2;
                    if values.len() % 2 == 0 {
                        (values[mid - 1] + values[mid]) / 2.0
                    } else {
                        values[mid]
                    }
                }
            };
            statistics.push(stat);
        }

        Ok(Self { strategy, statistics })
    }
}

/// Finite values of one column, or an error if there are none
fn observed(rows: &[Vec<Option<f64>>], col: usize) -> Result<Vec<f64>, InferenceError> {
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|r| r[col])
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() {
        return Err(InferenceError::FitError {
            stage: "numeric imputer",
            reason: format!("column {} has no observed values", col),
        });
    }
    Ok(values)
}

impl Transform for NumericImputer {
    type Input = Option<f64>;
    type Output = f64;

    fn n_features_in(&self) -> usize {
        self.statistics.len()
    }

    fn transform(&self, row: &[Option<f64>]) -> Result<Vec<f64>, StageError> {
        check_width(self.statistics.len(), row.len())?;
        Ok(row
            .iter()
            .zip(&self.statistics)
            .map(|(value, fill)| value.filter(|v| v.is_finite()).unwrap_or(*fill))
            .collect())
    }
}

// ----------------------------------------------------------------------------
// Categorical imputer
// ----------------------------------------------------------------------------

/// Fill strategy for categorical columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalStrategy {
    MostFrequent,
    Constant,
}

/// Replaces missing categorical cells with a per-column label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalImputer {
    pub strategy: CategoricalStrategy,
    pub statistics: Vec<String>,
}

impl CategoricalImputer {
    /// Compute fill labels from training rows. Ties in the most-frequent
    /// strategy resolve to the lexicographically smallest label.
    pub fn fit(
        strategy: CategoricalStrategy,
        rows: &[Vec<Option<String>>],
        fill_value: &str,
    ) -> Result<Self, InferenceError> {
        let width = block_width("categorical imputer", rows)?;
        let mut statistics = Vec::with_capacity(width);

        for col in 0..width {
            if strategy == CategoricalStrategy::Constant {
                statistics.push(fill_value.to_string());
                continue;
            }

            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for value in rows.iter().filter_map(|r| r[col].as_deref()) {
                *counts.entry(value).or_default() += 1;
            }

            let mut best: Option<(&str, usize)> = None;
            for (label, count) in counts {
                if best.map_or(true, |(_, c)| count > c) {
                    best = Some((label, count));
                }
            }

            let (label, _) = best.ok_or_else(|| InferenceError::FitError {
                stage: "categorical imputer",
                reason: format!("column {} has no observed values", col),
            })?;
            statistics.push(label.to_string());
        }

        Ok(Self { strategy, statistics })
    }
}

impl Transform for CategoricalImputer {
    type Input = Option<String>;
    type Output = String;

    fn n_features_in(&self) -> usize {
        self.statistics.len()
    }

    fn transform(&self, row: &[Option<String>]) -> Result<Vec<String>, StageError> {
        check_width(self.statistics.len(), row.len())?;
        Ok(row
            .iter()
            .zip(&self.statistics)
            .map(|(value, fill)| value.clone().unwrap_or_else(|| fill.clone()))
            .collect())
    }
}

// ----------------------------------------------------------------------------
// Standard scaler
// ----------------------------------------------------------------------------

/// Standardizes numeric columns to zero mean and unit variance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit with population standard deviation. Constant columns get a
    /// scale of 1.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, InferenceError> {
        let width = block_width("scaler", rows)?;
        let n = rows.len() as f64;

        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; width];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                let d = v - m;
                *acc += d * d;
            }
        }

        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }
}

impl Transform for StandardScaler {
    type Input = f64;
    type Output = f64;

    fn n_features_in(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, StageError> {
        check_width(self.mean.len(), row.len())?;
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }
}

// ----------------------------------------------------------------------------
// One-hot encoder
// ----------------------------------------------------------------------------

/// What to do with a category not seen during fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    /// Emit an all-zero block for the column
    Ignore,
}

/// Expands each categorical column into one indicator per known category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Known categories per column, in output order
    pub categories: Vec<Vec<String>>,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
}

impl OneHotEncoder {
    /// Learn sorted category lists from training rows
    pub fn fit(rows: &[Vec<String>], handle_unknown: HandleUnknown) -> Result<Self, InferenceError> {
        let width = block_width("encoder", rows)?;
        let categories = (0..width)
            .map(|col| {
                rows.iter()
                    .map(|r| r[col].clone())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .collect();

        Ok(Self {
            categories,
            handle_unknown,
        })
    }

    /// Number of output columns
    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }
}

impl Transform for OneHotEncoder {
    type Input = String;
    type Output = f64;

    fn n_features_in(&self) -> usize {
        self.categories.len()
    }

    fn transform(&self, row: &[String]) -> Result<Vec<f64>, StageError> {
        check_width(self.categories.len(), row.len())?;
        let mut out = Vec::with_capacity(self.width());

        for (col, (value, known)) in row.iter().zip(&self.categories).enumerate() {
            let hit = known.iter().position(|c| c == value);
            if hit.is_none() && self.handle_unknown == HandleUnknown::Error {
                return Err(StageError::UnknownCategory(col, value.clone()));
            }
            out.extend((0..known.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_median_imputer() {
        let rows = vec![
            vec![Some(1.0), None],
            vec![Some(4.0), Some(10.0)],
            vec![Some(2.0), Some(30.0)],
            vec![None, Some(20.0)],
            vec![Some(3.0), Some(40.0)],
        ];
        let imputer = NumericImputer::fit(NumericStrategy::Median, &rows, 0.0).unwrap();
        // column 0: [1,2,3,4] -> 2.5, column 1: [10,20,30,40] -> 25
        assert_eq!(imputer.statistics, vec![2.5, 25.0]);

        let out = imputer.transform(&[None, Some(7.0)]).unwrap();
        assert_eq!(out, vec![2.5, 7.0]);
    }

    #[test]
    fn test_mean_and_constant_imputer() {
        let rows = vec![vec![Some(1.0)], vec![Some(2.0)], vec![None]];
        let mean = NumericImputer::fit(NumericStrategy::Mean, &rows, 0.0).unwrap();
        assert_eq!(mean.statistics, vec![1.5]);

        let constant = NumericImputer::fit(NumericStrategy::Constant, &rows, -1.0).unwrap();
        assert_eq!(constant.transform(&[Some(f64::NAN)]).unwrap(), vec![-1.0]);
    }

    #[test]
    fn test_imputer_rejects_empty_column() {
        let rows = vec![vec![None], vec![None]];
        let err = NumericImputer::fit(NumericStrategy::Median, &rows, 0.0).unwrap_err();
        assert!(matches!(err, InferenceError::FitError { .. }));
    }

    #[test]
    fn test_most_frequent_tie_breaks_lexicographically() {
        let rows = vec![
            vec![Some("Van".to_string())],
            vec![Some("Truck".to_string())],
            vec![None],
        ];
        let imputer = CategoricalImputer::fit(CategoricalStrategy::MostFrequent, &rows, "").unwrap();
        assert_eq!(imputer.statistics, strings(&["Truck"]));
        assert_eq!(imputer.transform(&[None]).unwrap(), strings(&["Truck"]));
    }

    #[test]
    fn test_scaler_population_std() {
        let rows = vec![vec![2.0, 5.0], vec![4.0, 5.0], vec![6.0, 5.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert_eq!(scaler.mean, vec![4.0, 5.0]);
        assert!((scaler.scale[0] - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        // constant column keeps unit scale
        assert_eq!(scaler.scale[1], 1.0);

        let out = scaler.transform(&[4.0, 7.0]).unwrap();
        assert_eq!(out, vec![0.0, 2.0]);
    }

    #[test]
    fn test_scaler_width_mismatch() {
        let scaler = StandardScaler {
            mean: vec![0.0; 3],
            scale: vec![1.0; 3],
        };
        assert_eq!(
            scaler.transform(&[1.0]).unwrap_err(),
            StageError::Width { expected: 3, actual: 1 }
        );
    }

    #[test]
    fn test_encoder_fit_sorts_categories() {
        let rows = vec![
            strings(&["Van", "Poor"]),
            strings(&["Truck", "Good"]),
            strings(&["Van", "Fair"]),
        ];
        let encoder = OneHotEncoder::fit(&rows, HandleUnknown::Error).unwrap();
        assert_eq!(encoder.categories[0], strings(&["Truck", "Van"]));
        assert_eq!(encoder.categories[1], strings(&["Fair", "Good", "Poor"]));
        assert_eq!(encoder.width(), 5);

        let out = encoder.transform(&strings(&["Van", "Good"])).unwrap();
        assert_eq!(out, vec![0.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_encoder_unknown_handling() {
        let mut encoder = OneHotEncoder {
            categories: vec![strings(&["Truck", "Van"])],
            handle_unknown: HandleUnknown::Error,
        };
        assert_eq!(
            encoder.transform(&strings(&["Bus"])).unwrap_err(),
            StageError::UnknownCategory(0, "Bus".to_string())
        );

        encoder.handle_unknown = HandleUnknown::Ignore;
        assert_eq!(encoder.transform(&strings(&["Bus"])).unwrap(), vec![0.0, 0.0]);
    }

    proptest! {
        #[test]
        fn prop_scaled_training_columns_are_centred(
            rows in prop::collection::vec(prop::collection::vec((-1000i32..1000).prop_map(f64::from), 3), 2..40)
        ) {
            let scaler = StandardScaler::fit(&rows).unwrap();
            let scaled: Vec<Vec<f64>> = rows.iter().map(|r| scaler.transform(r).unwrap()).collect();
            for col in 0..3 {
                let mean = scaled.iter().map(|r| r[col]).sum::<f64>() / rows.len() as f64;
                prop_assert!(mean.abs() < 1e-6);
            }
        }

        #[test]
        fn prop_known_category_sets_one_indicator(idx in 0usize..3) {
            let encoder = OneHotEncoder {
                categories: vec![strings(&["Fair", "Good", "Poor"])],
                handle_unknown: HandleUnknown::Error,
            };
            let value = encoder.categories[0][idx].clone();
            let out = encoder.transform(&[value]).unwrap();
            prop_assert_eq!(out.iter().sum::<f64>(), 1.0);
            prop_assert_eq!(out[idx], 1.0);
        }
    }
}

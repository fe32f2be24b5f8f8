//! Feature Record Assembly

use crate::columns::*;
use crate::reading::VehicleReading;
use serde::{Deserialize, Serialize};
use tracing::debug;

const CORE_COLUMNS: [&str; 9] = [
    USAGE_HOURS,
    ENGINE_TEMPERATURE,
    TIRE_PRESSURE,
    OIL_QUALITY,
    MAINTENANCE_COST,
    VEHICLE_TYPE,
    BRAKE_CONDITION,
    ANOMALIES_DETECTED,
    FAILURE_HISTORY,
];

const EXTENDED_COLUMNS: [&str; 11] = [
    USAGE_HOURS,
    ENGINE_TEMPERATURE,
    TIRE_PRESSURE,
    OIL_QUALITY,
    MAINTENANCE_COST,
    VEHICLE_TYPE,
    BRAKE_CONDITION,
    ANOMALIES_DETECTED,
    FAILURE_HISTORY,
    BATTERY_VOLTAGE,
    VIBRATION_LEVEL,
];

/// Column set a model was trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSet {
    /// Nine usage, temperature, wear and history columns
    #[default]
    Core,
    /// Core columns plus battery voltage and vibration level
    Extended,
}

impl FeatureSet {
    /// Column names in record order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            FeatureSet::Core => &CORE_COLUMNS,
            FeatureSet::Extended => &EXTENDED_COLUMNS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureSet::Core => "core",
            FeatureSet::Extended => "extended",
        }
    }
}

/// A single record cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Category(String),
    Missing,
}

impl Cell {
    /// Numeric cell, with non-finite values treated as missing
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            Cell::Number(value)
        } else {
            Cell::Missing
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            Cell::Category(c) => Some(c.as_str()),
            _ => None,
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map(Cell::number).unwrap_or(Cell::Missing)
    }
}

/// One-row tabular record with a fixed column schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    feature_set: FeatureSet,
    cells: Vec<Cell>,
}

impl FeatureRecord {
    pub fn feature_set(&self) -> FeatureSet {
        self.feature_set
    }

    /// Column names in record order
    pub fn columns(&self) -> &'static [&'static str] {
        self.feature_set.columns()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Look up a cell by column name
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.columns()
            .iter()
            .position(|c| *c == column)
            .map(|idx| &self.cells[idx])
    }
}

/// Map a reading into the record layout of `feature_set`
pub fn assemble(reading: &VehicleReading, feature_set: FeatureSet) -> FeatureRecord {
    let mut cells = vec![
        Cell::number(reading.usage_hours),
        Cell::number(reading.engine_temperature),
        Cell::number(reading.tire_pressure),
        Cell::number(reading.oil_quality),
        Cell::number(reading.maintenance_cost),
        Cell::Category(reading.vehicle_type.as_str().to_string()),
        Cell::Category(reading.brake_condition.as_str().to_string()),
        Cell::Number(reading.anomalies_detected.as_flag()),
        Cell::Number(reading.failure_history.as_flag()),
    ];

    if feature_set == FeatureSet::Extended {
        cells.push(Cell::from(reading.battery_voltage));
        cells.push(Cell::from(reading.vibration_level));
    }

    debug_assert_eq!(cells.len(), feature_set.columns().len());

    let missing = cells.iter().filter(|c| c.is_missing()).count();
    debug!(
        "Assembled {} record: {} columns, {} missing",
        feature_set.as_str(),
        cells.len(),
        missing
    );

    FeatureRecord { feature_set, cells }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{BrakeCondition, VehicleType, YesNo};
    use proptest::prelude::*;

    #[test]
    fn test_core_column_order() {
        let record = assemble(&VehicleReading::default(), FeatureSet::Core);
        assert_eq!(
            record.columns(),
            &[
                "Usage_Hours",
                "Engine_Temperature",
                "Tire_Pressure",
                "Oil_Quality",
                "Maintenance_Cost",
                "Vehicle_Type",
                "Brake_Condition",
                "Anomalies_Detected",
                "Failure_History",
            ]
        );
        assert_eq!(record.cells().len(), 9);
    }

    #[test]
    fn test_extended_appends_battery_and_vibration() {
        let reading = VehicleReading {
            battery_voltage: Some(11.9),
            vibration_level: None,
            ..Default::default()
        };
        let record = assemble(&reading, FeatureSet::Extended);

        assert_eq!(record.cells().len(), 11);
        assert_eq!(record.get(BATTERY_VOLTAGE), Some(&Cell::Number(11.9)));
        assert_eq!(record.get(VIBRATION_LEVEL), Some(&Cell::Missing));
    }

    #[test]
    fn test_yes_no_encoding() {
        let reading = VehicleReading {
            anomalies_detected: YesNo::Yes,
            failure_history: YesNo::No,
            ..Default::default()
        };
        let record = assemble(&reading, FeatureSet::Core);

        assert_eq!(record.get(ANOMALIES_DETECTED), Some(&Cell::Number(1.0)));
        assert_eq!(record.get(FAILURE_HISTORY), Some(&Cell::Number(0.0)));
    }

    #[test]
    fn test_categories_use_form_labels() {
        let reading = VehicleReading {
            vehicle_type: VehicleType::Van,
            brake_condition: BrakeCondition::Fair,
            ..Default::default()
        };
        let record = assemble(&reading, FeatureSet::Core);

        assert_eq!(record.get(VEHICLE_TYPE).and_then(Cell::as_category), Some("Van"));
        assert_eq!(record.get(BRAKE_CONDITION).and_then(Cell::as_category), Some("Fair"));
        assert!(record.get(BATTERY_VOLTAGE).is_none());
    }

    #[test]
    fn test_non_finite_becomes_missing() {
        let reading = VehicleReading {
            engine_temperature: f64::NAN,
            ..Default::default()
        };
        let record = assemble(&reading, FeatureSet::Core);
        assert!(record.get(ENGINE_TEMPERATURE).unwrap().is_missing());
    }

    proptest! {
        #[test]
        fn prop_numeric_fields_pass_through(usage in 0.0f64..1e6, temp in -40.0f64..200.0) {
            let reading = VehicleReading {
                usage_hours: usage,
                engine_temperature: temp,
                ..Default::default()
            };
            let record = assemble(&reading, FeatureSet::Core);
            prop_assert_eq!(record.get(USAGE_HOURS).and_then(Cell::as_number), Some(usage));
            prop_assert_eq!(record.get(ENGINE_TEMPERATURE).and_then(Cell::as_number), Some(temp));
        }
    }
}

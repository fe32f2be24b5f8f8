//! Form Schema
//!
//! Declarative description of the input form. The page renderer and the
//! `/api/v1/schema` endpoint both read from this, so field names here must
//! match the `VehicleReading` serde names.

use crate::features::FeatureSet;
use crate::reading::{BrakeCondition, VehicleReading, VehicleType, YesNo};
use serde::Serialize;

/// Input widget kind with its bounds and default
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Widget {
    Number {
        min: Option<f64>,
        max: Option<f64>,
        step: f64,
        default: f64,
    },
    Slider {
        min: f64,
        max: f64,
        step: f64,
        default: f64,
    },
    Select {
        options: Vec<&'static str>,
        default: &'static str,
    },
}

/// A single form field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    /// Submission name
    pub name: &'static str,
    /// Human label
    pub label: &'static str,
    /// Layout column: 1 or 2 for the side-by-side block, 0 for full width
    pub column: u8,
    /// Blank submissions are rejected; optional fields are imputed instead
    pub required: bool,
    #[serde(flatten)]
    pub widget: Widget,
}

/// Complete form layout for one feature set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSchema {
    pub feature_set: FeatureSet,
    pub fields: Vec<FieldSpec>,
}

fn select<T: Copy>(all: &[T], default: T, label: fn(&T) -> &'static str) -> Widget {
    Widget::Select {
        options: all.iter().map(label).collect(),
        default: label(&default),
    }
}

impl FormSchema {
    /// Build the form layout for `feature_set`, pre-filled with the reading defaults
    pub fn for_feature_set(feature_set: FeatureSet) -> Self {
        let d = VehicleReading::default();

        let mut fields = vec![
            FieldSpec {
                name: "usage_hours",
                label: "Usage Hours (Mileage)",
                column: 1,
                required: true,
                widget: Widget::Number { min: Some(0.0), max: None, step: 1.0, default: d.usage_hours },
            },
            FieldSpec {
                name: "maintenance_cost",
                label: "Last Maintenance Cost ($)",
                column: 1,
                required: true,
                widget: Widget::Number { min: Some(0.0), max: None, step: 0.01, default: d.maintenance_cost },
            },
            FieldSpec {
                name: "vehicle_type",
                label: "Vehicle Type",
                column: 1,
                required: true,
                widget: select(&VehicleType::ALL, d.vehicle_type, VehicleType::as_str),
            },
            FieldSpec {
                name: "engine_temperature",
                label: "Engine Temperature (°C)",
                column: 2,
                required: true,
                widget: Widget::Number { min: None, max: None, step: 0.1, default: d.engine_temperature },
            },
            FieldSpec {
                name: "tire_pressure",
                label: "Tire Pressure (PSI)",
                column: 2,
                required: true,
                widget: Widget::Number { min: None, max: None, step: 0.1, default: d.tire_pressure },
            },
            FieldSpec {
                name: "oil_quality",
                label: "Oil Quality Score (0-100)",
                column: 2,
                required: true,
                widget: Widget::Slider { min: 0.0, max: 100.0, step: 0.01, default: d.oil_quality },
            },
        ];

        if feature_set == FeatureSet::Extended {
            fields.push(FieldSpec {
                name: "battery_voltage",
                label: "Battery Voltage (V)",
                column: 1,
                required: false,
                widget: Widget::Number { min: Some(0.0), max: None, step: 0.1, default: 12.6 },
            });
            fields.push(FieldSpec {
                name: "vibration_level",
                label: "Vibration Level",
                column: 2,
                required: false,
                widget: Widget::Number { min: Some(0.0), max: None, step: 0.1, default: 1.0 },
            });
        }

        fields.extend([
            FieldSpec {
                name: "brake_condition",
                label: "Brake Condition",
                column: 0,
                required: true,
                widget: select(&BrakeCondition::ALL, d.brake_condition, BrakeCondition::as_str),
            },
            FieldSpec {
                name: "anomalies_detected",
                label: "Anomalies Detected?",
                column: 0,
                required: true,
                widget: select(&YesNo::ALL, d.anomalies_detected, YesNo::as_str),
            },
            FieldSpec {
                name: "failure_history",
                label: "Past Failure History?",
                column: 0,
                required: true,
                widget: select(&YesNo::ALL, d.failure_history, YesNo::as_str),
            },
        ]);

        Self { feature_set, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_schema_fields() {
        let schema = FormSchema::for_feature_set(FeatureSet::Core);
        assert_eq!(schema.fields.len(), 9);
        assert!(schema.field("battery_voltage").is_none());

        match &schema.field("oil_quality").unwrap().widget {
            Widget::Slider { min, max, step, default } => {
                assert_eq!((*min, *max, *default), (0.0, 100.0, 85.0));
                assert_eq!(*step, 0.01);
            }
            other => panic!("unexpected widget: {:?}", other),
        }
    }

    #[test]
    fn test_select_options_follow_form_order() {
        let schema = FormSchema::for_feature_set(FeatureSet::Core);
        match &schema.field("anomalies_detected").unwrap().widget {
            Widget::Select { options, default } => {
                assert_eq!(options, &vec!["No", "Yes"]);
                assert_eq!(*default, "No");
            }
            other => panic!("unexpected widget: {:?}", other),
        }
    }

    #[test]
    fn test_extended_schema_serializes() {
        let schema = FormSchema::for_feature_set(FeatureSet::Extended);
        assert_eq!(schema.fields.len(), 11);

        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["feature_set"], "extended");
        let battery = json["fields"]
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["name"] == "battery_voltage")
            .unwrap();
        assert_eq!(battery["kind"], "number");
        assert_eq!(battery["default"], 12.6);
    }

    #[test]
    fn test_only_extended_readings_are_optional() {
        let schema = FormSchema::for_feature_set(FeatureSet::Extended);
        let optional: Vec<_> = schema
            .fields
            .iter()
            .filter(|f| !f.required)
            .map(|f| f.name)
            .collect();
        assert_eq!(optional, vec!["battery_voltage", "vibration_level"]);

        let json = serde_json::to_value(schema.field("usage_hours").unwrap()).unwrap();
        assert_eq!(json["required"], true);
    }
}

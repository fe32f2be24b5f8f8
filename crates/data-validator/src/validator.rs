//! Reading Validator for Range Checking

use crate::error::ValidationError;
use feature_engine::{FeatureSet, VehicleReading};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Inclusive bounds; an absent side is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl Bounds {
    pub const UNBOUNDED: Bounds = Bounds { min: None, max: None };

    pub const fn at_least(min: f64) -> Self {
        Self { min: Some(min), max: None }
    }

    pub const fn between(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Validation configuration, defaulting to the form's widget bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub usage_hours: Bounds,
    /// Engine temperature (°C)
    pub engine_temperature: Bounds,
    /// Tire pressure (PSI)
    pub tire_pressure: Bounds,
    pub oil_quality: Bounds,
    pub maintenance_cost: Bounds,
    pub battery_voltage: Bounds,
    pub vibration_level: Bounds,
    /// Reject extended submissions lacking battery/vibration instead of imputing
    pub require_extended_readings: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            usage_hours: Bounds::at_least(0.0),
            engine_temperature: Bounds::UNBOUNDED,
            tire_pressure: Bounds::UNBOUNDED,
            oil_quality: Bounds::between(0.0, 100.0),
            maintenance_cost: Bounds::at_least(0.0),
            battery_voltage: Bounds::at_least(0.0),
            vibration_level: Bounds::at_least(0.0),
            require_extended_readings: false,
        }
    }
}

/// Result of validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether all values are valid
    pub valid: bool,
    /// List of validation errors
    pub errors: Vec<ValidationError>,
    /// Number of fields validated
    pub fields_checked: usize,
}

impl ValidationResult {
    fn from_errors(errors: Vec<ValidationError>, fields_checked: usize) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            fields_checked,
        }
    }

    /// Convert into a `Result`, keeping every error
    pub fn into_result(self) -> Result<(), Vec<ValidationError>> {
        if self.valid {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Validator for vehicle readings
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a single value against bounds
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        bounds: Bounds,
    ) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite { field });
        }
        if bounds.contains(value) {
            Ok(())
        } else {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: bounds.min.unwrap_or(f64::NEG_INFINITY),
                max: bounds.max.unwrap_or(f64::INFINITY),
            })
        }
    }

    /// Validate every field of a reading relevant to `feature_set`
    pub fn validate(&self, reading: &VehicleReading, feature_set: FeatureSet) -> ValidationResult {
        let c = &self.config;
        let mut checks = vec![
            self.validate_range("usage_hours", reading.usage_hours, c.usage_hours),
            self.validate_range("engine_temperature", reading.engine_temperature, c.engine_temperature),
            self.validate_range("tire_pressure", reading.tire_pressure, c.tire_pressure),
            self.validate_range("oil_quality", reading.oil_quality, c.oil_quality),
            self.validate_range("maintenance_cost", reading.maintenance_cost, c.maintenance_cost),
        ];

        if feature_set == FeatureSet::Extended {
            for (field, value, bounds) in [
                ("battery_voltage", reading.battery_voltage, c.battery_voltage),
                ("vibration_level", reading.vibration_level, c.vibration_level),
            ] {
                match value {
                    Some(v) => checks.push(self.validate_range(field, v, bounds)),
                    None if c.require_extended_readings => {
                        checks.push(Err(ValidationError::MissingField(field)))
                    }
                    None => {}
                }
            }
        }

        let fields_checked = checks.len();
        let errors: Vec<_> = checks.into_iter().filter_map(Result::err).collect();
        if !errors.is_empty() {
            debug!("Reading rejected with {} validation errors", errors.len());
        }

        ValidationResult::from_errors(errors, fields_checked)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_reading_is_valid() {
        let validator = Validator::default();
        let result = validator.validate(&VehicleReading::default(), FeatureSet::Core);
        assert!(result.valid);
        assert_eq!(result.fields_checked, 5);
    }

    #[test]
    fn test_negative_usage_rejected() {
        let validator = Validator::default();
        let reading = VehicleReading {
            usage_hours: -1.0,
            ..Default::default()
        };
        let errors = validator
            .validate(&reading, FeatureSet::Core)
            .into_result()
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), "usage_hours");
    }

    #[test]
    fn test_oil_quality_bounds_inclusive() {
        let validator = Validator::default();
        let bounds = validator.config().oil_quality;
        assert!(validator.validate_range("oil_quality", 0.0, bounds).is_ok());
        assert!(validator.validate_range("oil_quality", 100.0, bounds).is_ok());
        assert!(validator.validate_range("oil_quality", 100.5, bounds).is_err());
    }

    #[test]
    fn test_collects_all_errors() {
        let validator = Validator::default();
        let reading = VehicleReading {
            usage_hours: -10.0,
            oil_quality: 140.0,
            maintenance_cost: f64::NAN,
            ..Default::default()
        };
        let result = validator.validate(&reading, FeatureSet::Core);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 3);
        assert!(result
            .errors
            .contains(&ValidationError::NotFinite { field: "maintenance_cost" }));
    }

    #[test]
    fn test_extended_readings_optional_by_default() {
        let validator = Validator::default();
        let reading = VehicleReading::default();
        assert!(validator.validate(&reading, FeatureSet::Extended).valid);

        let strict = Validator::new(ValidationConfig {
            require_extended_readings: true,
            ..Default::default()
        });
        let errors = strict
            .validate(&reading, FeatureSet::Extended)
            .into_result()
            .unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingField("battery_voltage"),
                ValidationError::MissingField("vibration_level"),
            ]
        );
    }

    #[test]
    fn test_extended_fields_ignored_for_core() {
        let validator = Validator::default();
        let reading = VehicleReading {
            battery_voltage: Some(-3.0),
            ..Default::default()
        };
        assert!(validator.validate(&reading, FeatureSet::Core).valid);
        assert!(!validator.validate(&reading, FeatureSet::Extended).valid);
    }

    proptest! {
        #[test]
        fn prop_temperature_unbounded(temp in -1e6f64..1e6) {
            let validator = Validator::default();
            let reading = VehicleReading { engine_temperature: temp, ..Default::default() };
            prop_assert!(validator.validate(&reading, FeatureSet::Core).valid);
        }
    }
}

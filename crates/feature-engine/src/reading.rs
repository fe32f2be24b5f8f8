//! Vehicle Reading

use serde::{Deserialize, Serialize};

/// Vehicle body type as offered by the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VehicleType {
    #[default]
    Truck,
    Van,
}

impl VehicleType {
    /// All selectable values, in form order
    pub const ALL: [VehicleType; 2] = [VehicleType::Truck, VehicleType::Van];

    /// Category label expected by the encoder
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Truck => "Truck",
            VehicleType::Van => "Van",
        }
    }
}

/// Brake wear as judged by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrakeCondition {
    #[default]
    Good,
    Fair,
    Poor,
}

impl BrakeCondition {
    pub const ALL: [BrakeCondition; 3] =
        [BrakeCondition::Good, BrakeCondition::Fair, BrakeCondition::Poor];

    pub fn as_str(&self) -> &'static str {
        match self {
            BrakeCondition::Good => "Good",
            BrakeCondition::Fair => "Fair",
            BrakeCondition::Poor => "Poor",
        }
    }
}

/// Yes/No answer, encoded as 1/0 in the feature record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum YesNo {
    #[default]
    No,
    Yes,
}

impl YesNo {
    /// Form order puts "No" first
    pub const ALL: [YesNo; 2] = [YesNo::No, YesNo::Yes];

    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::No => "No",
            YesNo::Yes => "Yes",
        }
    }

    /// Numeric flag value
    pub fn as_flag(&self) -> f64 {
        match self {
            YesNo::No => 0.0,
            YesNo::Yes => 1.0,
        }
    }
}

/// One form submission. Lives for a single request and is never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleReading {
    /// Usage hours (mileage)
    pub usage_hours: f64,
    /// Engine temperature (°C)
    pub engine_temperature: f64,
    /// Tire pressure (PSI)
    pub tire_pressure: f64,
    /// Oil quality score (0-100)
    pub oil_quality: f64,
    /// Last maintenance cost ($)
    pub maintenance_cost: f64,
    pub vehicle_type: VehicleType,
    pub brake_condition: BrakeCondition,
    pub anomalies_detected: YesNo,
    pub failure_history: YesNo,
    /// Battery voltage (V), extended feature set only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_voltage: Option<f64>,
    /// Vibration level, extended feature set only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibration_level: Option<f64>,
}

impl Default for VehicleReading {
    /// Values the form is pre-filled with
    fn default() -> Self {
        Self {
            usage_hours: 5000.0,
            engine_temperature: 90.0,
            tire_pressure: 35.0,
            oil_quality: 85.0,
            maintenance_cost: 150.0,
            vehicle_type: VehicleType::Truck,
            brake_condition: BrakeCondition::Good,
            anomalies_detected: YesNo::No,
            failure_history: YesNo::No,
            battery_voltage: None,
            vibration_level: None,
        }
    }
}

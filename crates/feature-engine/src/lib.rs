//! Feature Assembly
//!
//! Maps a submitted vehicle reading into the one-row, fixed-schema record
//! the maintenance model was trained on.

mod features;
mod reading;
mod schema;

pub use features::{assemble, Cell, FeatureRecord, FeatureSet};
pub use reading::{BrakeCondition, VehicleReading, VehicleType, YesNo};
pub use schema::{FieldSpec, FormSchema, Widget};

/// Column names as they appear in the training data
pub mod columns {
    pub const USAGE_HOURS: &str = "Usage_Hours";
    pub const ENGINE_TEMPERATURE: &str = "Engine_Temperature";
    pub const TIRE_PRESSURE: &str = "Tire_Pressure";
    pub const OIL_QUALITY: &str = "Oil_Quality";
    pub const MAINTENANCE_COST: &str = "Maintenance_Cost";
    pub const VEHICLE_TYPE: &str = "Vehicle_Type";
    pub const BRAKE_CONDITION: &str = "Brake_Condition";
    pub const ANOMALIES_DETECTED: &str = "Anomalies_Detected";
    pub const FAILURE_HISTORY: &str = "Failure_History";
    pub const BATTERY_VOLTAGE: &str = "Battery_Voltage";
    pub const VIBRATION_LEVEL: &str = "Vibration_Level";

    /// Columns a submission may leave empty
    pub const OPTIONAL: [&str; 2] = [BATTERY_VOLTAGE, VIBRATION_LEVEL];
}

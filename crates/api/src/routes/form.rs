//! Form Routes
//!
//! `GET /` renders the pre-filled form, `POST /` scores a url-encoded
//! submission and renders the same page with the verdict underneath.

use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    Form,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::page::{self, FormValues, Outcome};
use crate::{AppState, AssessError};
use feature_engine::{BrakeCondition, FormSchema, VehicleReading, VehicleType, YesNo};

/// Render the empty form
pub async fn show_form(State(state): State<Arc<AppState>>) -> Html<String> {
    let values = FormValues::defaults(&state.schema);
    Html(page::render(&state.title, &state.schema, &values, None))
}

/// Score a submitted form
pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    Form(submitted): Form<HashMap<String, String>>,
) -> (StatusCode, Html<String>) {
    let values = FormValues::from_submission(&state.schema, &submitted);

    let (status, outcome) = match parse_reading(&state.schema, &submitted) {
        Err(errors) => (StatusCode::UNPROCESSABLE_ENTITY, Outcome::Errors(errors)),
        Ok(reading) => match state.assess(&reading) {
            Ok(assessment) => (StatusCode::OK, Outcome::Verdict(assessment.verdict)),
            Err(AssessError::Invalid(errors)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Outcome::Errors(errors.iter().map(|e| e.to_string()).collect()),
            ),
            Err(AssessError::Inference(e)) => {
                warn!("Form prediction failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Outcome::Errors(vec![format!("Prediction failed: {}", e)]),
                )
            }
        },
    };

    let html = page::render(&state.title, &state.schema, &values, Some(&outcome));
    (status, Html(html))
}

fn label<'a>(schema: &'a FormSchema, name: &'a str) -> &'a str {
    schema.field(name).map_or(name, |f| f.label)
}

fn raw<'a>(submitted: &'a HashMap<String, String>, name: &str) -> &'a str {
    submitted.get(name).map_or("", |v| v.trim())
}

fn number(schema: &FormSchema, submitted: &HashMap<String, String>, name: &str) -> Result<f64, String> {
    let value = raw(submitted, name);
    if value.is_empty() {
        return Err(format!("{} is required", label(schema, name)));
    }
    value
        .parse()
        .map_err(|_| format!("{} must be a number, got {:?}", label(schema, name), value))
}

/// Blank means "not measured" and is left to the model's imputer
fn optional_number(
    schema: &FormSchema,
    submitted: &HashMap<String, String>,
    name: &str,
) -> Result<Option<f64>, String> {
    if raw(submitted, name).is_empty() {
        return Ok(None);
    }
    number(schema, submitted, name).map(Some)
}

fn choice<T: Copy>(
    schema: &FormSchema,
    submitted: &HashMap<String, String>,
    name: &str,
    all: &[T],
    as_str: fn(&T) -> &'static str,
) -> Result<T, String> {
    let value = raw(submitted, name);
    all.iter()
        .find(|option| as_str(*option) == value)
        .copied()
        .ok_or_else(|| {
            let options: Vec<_> = all.iter().map(as_str).collect();
            format!(
                "{} must be one of {}, got {:?}",
                label(schema, name),
                options.join(", "),
                value
            )
        })
}

fn collect<T: Default>(result: Result<T, String>, errors: &mut Vec<String>) -> T {
    result.unwrap_or_else(|e| {
        errors.push(e);
        T::default()
    })
}

/// Parse the url-encoded fields into a reading, reporting every bad field
/// at once. Range checks are left to the validator.
fn parse_reading(
    schema: &FormSchema,
    submitted: &HashMap<String, String>,
) -> Result<VehicleReading, Vec<String>> {
    let mut errors = Vec::new();
    let num = |name| number(schema, submitted, name);

    let mut reading = VehicleReading {
        usage_hours: collect(num("usage_hours"), &mut errors),
        engine_temperature: collect(num("engine_temperature"), &mut errors),
        tire_pressure: collect(num("tire_pressure"), &mut errors),
        oil_quality: collect(num("oil_quality"), &mut errors),
        maintenance_cost: collect(num("maintenance_cost"), &mut errors),
        vehicle_type: collect(
            choice(schema, submitted, "vehicle_type", &VehicleType::ALL, VehicleType::as_str),
            &mut errors,
        ),
        brake_condition: collect(
            choice(schema, submitted, "brake_condition", &BrakeCondition::ALL, BrakeCondition::as_str),
            &mut errors,
        ),
        anomalies_detected: collect(
            choice(schema, submitted, "anomalies_detected", &YesNo::ALL, YesNo::as_str),
            &mut errors,
        ),
        failure_history: collect(
            choice(schema, submitted, "failure_history", &YesNo::ALL, YesNo::as_str),
            &mut errors,
        ),
        battery_voltage: None,
        vibration_level: None,
    };

    for name in ["battery_voltage", "vibration_level"] {
        let parsed = match schema.field(name) {
            None => continue,
            Some(field) if field.required => number(schema, submitted, name).map(Some),
            Some(_) => optional_number(schema, submitted, name),
        };
        let value = collect(parsed, &mut errors);
        match name {
            "battery_voltage" => reading.battery_voltage = value,
            _ => reading.vibration_level = value,
        }
    }

    if errors.is_empty() {
        Ok(reading)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_engine::FeatureSet;

    fn submission(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut fields: HashMap<String, String> = [
            ("usage_hours", "5000"),
            ("engine_temperature", "90"),
            ("tire_pressure", "35"),
            ("oil_quality", "85"),
            ("maintenance_cost", "150"),
            ("vehicle_type", "Truck"),
            ("brake_condition", "Good"),
            ("anomalies_detected", "No"),
            ("failure_history", "No"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in pairs {
            fields.insert(k.to_string(), v.to_string());
        }
        fields
    }

    #[test]
    fn test_parse_default_submission() {
        let schema = FormSchema::for_feature_set(FeatureSet::Core);
        let reading = parse_reading(&schema, &submission(&[])).unwrap();
        assert_eq!(reading, VehicleReading::default());
    }

    #[test]
    fn test_parse_reports_every_bad_field() {
        let schema = FormSchema::for_feature_set(FeatureSet::Core);
        let errors = parse_reading(
            &schema,
            &submission(&[("usage_hours", "lots"), ("tire_pressure", ""), ("vehicle_type", "Bus")]),
        )
        .unwrap_err();

        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("Usage Hours (Mileage) must be a number"));
        assert_eq!(errors[1], "Tire Pressure (PSI) is required");
        assert!(errors[2].contains("must be one of Truck, Van"));
    }

    #[test]
    fn test_extended_fields_only_for_extended_schema() {
        let fields = submission(&[("battery_voltage", "11.9"), ("vibration_level", "")]);

        let core = FormSchema::for_feature_set(FeatureSet::Core);
        let reading = parse_reading(&core, &fields).unwrap();
        assert_eq!(reading.battery_voltage, None);

        let extended = FormSchema::for_feature_set(FeatureSet::Extended);
        let reading = parse_reading(&extended, &fields).unwrap();
        assert_eq!(reading.battery_voltage, Some(11.9));
        assert_eq!(reading.vibration_level, None);
    }
}

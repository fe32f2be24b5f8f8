//! Prediction Routes

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::{AppState, AssessError};
use alerting::Verdict;
use feature_engine::{FeatureSet, VehicleReading};

/// Response for the predict endpoint
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub verdict: Verdict,
    /// `[p(no maintenance), p(maintenance)]`
    pub probabilities: [f64; 2],
    pub model: String,
    pub feature_set: FeatureSet,
    pub latency_ms: f64,
}

/// One rejected field
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Error body shared by every failing API response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

impl IntoResponse for AssessError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AssessError::Invalid(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: "validation_failed",
                    message: format!("{} invalid field(s)", errors.len()),
                    details: errors
                        .iter()
                        .map(|e| FieldError {
                            field: e.field(),
                            message: e.to_string(),
                        })
                        .collect(),
                },
            ),
            AssessError::Inference(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "inference_failed",
                    message: e.to_string(),
                    details: Vec::new(),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Errors from the predict endpoint
#[derive(Debug, Error)]
pub enum ApiError {
    /// Body was not a JSON `VehicleReading`
    #[error("invalid request body: {0}")]
    Body(#[from] JsonRejection),
    #[error(transparent)]
    Assess(#[from] AssessError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Body(rejection) => {
                let body = ErrorResponse {
                    error: "invalid_body",
                    message: rejection.body_text(),
                    details: Vec::new(),
                };
                (rejection.status(), Json(body)).into_response()
            }
            ApiError::Assess(err) => err.into_response(),
        }
    }
}

/// Score one reading
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Json<VehicleReading>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(reading) = body.map_err(|rejection| {
        metrics::counter!("maintenance_rejections_total", "reason" => "body").increment(1);
        rejection
    })?;
    let assessment = state.assess(&reading)?;
    debug!("Prediction {} served", assessment.verdict.id);

    Ok(Json(PredictionResponse {
        probabilities: assessment.inference.probabilities,
        latency_ms: assessment.inference.latency.as_secs_f64() * 1000.0,
        verdict: assessment.verdict,
        model: state.engine.name().to_string(),
        feature_set: state.feature_set(),
    }))
}

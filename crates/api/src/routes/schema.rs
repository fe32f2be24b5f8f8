//! Form Schema Route

use axum::{extract::State, Json};
use feature_engine::FormSchema;
use std::sync::Arc;

use crate::AppState;

/// Get the form layout for the loaded model's feature set
pub async fn get_schema(State(state): State<Arc<AppState>>) -> Json<FormSchema> {
    Json(state.schema.clone())
}

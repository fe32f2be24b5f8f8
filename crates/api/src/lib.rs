//! Vehicle Maintenance Risk Server
//!
//! Serves the reading form and a JSON API. Each submission is validated,
//! assembled into a feature record, scored by the shared model and mapped
//! to a verdict. Nothing is stored.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod settings;
mod page;
mod routes;

pub use settings::{LoggingSettings, Settings};

use alerting::{RiskBands, Verdict};
use anyhow::Context;
use data_validator::{ValidationError, Validator};
use feature_engine::{assemble, FeatureSet, FormSchema, VehicleReading};
use inference_engine::{InferenceEngine, InferenceError, InferenceResult};

/// Why a submission produced no verdict
#[derive(Debug, Error)]
pub enum AssessError {
    #[error("{} invalid field(s)", .0.len())]
    Invalid(Vec<ValidationError>),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Verdict plus the raw inference output it was derived from
#[derive(Debug, Clone)]
pub struct Assessment {
    pub verdict: Verdict,
    pub inference: InferenceResult,
}

/// Application state shared across handlers. Read-only after startup apart
/// from the prediction counter.
pub struct AppState {
    /// Loaded model, shared by every request
    pub engine: Arc<InferenceEngine>,
    pub validator: Validator,
    pub bands: RiskBands,
    /// Form layout for the model's feature set
    pub schema: FormSchema,
    pub title: String,
    pub artifact_path: String,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    prediction_count: AtomicU64,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state around a loaded engine
    pub fn new(
        settings: &Settings,
        engine: Arc<InferenceEngine>,
        metrics: Option<PrometheusHandle>,
    ) -> anyhow::Result<Self> {
        settings.risk.validate().context("invalid risk thresholds")?;

        let feature_set = engine.feature_set();
        if let Some(expected) = settings.model.feature_set {
            anyhow::ensure!(
                expected == feature_set,
                "configured feature set {} does not match the {} artifact",
                expected.as_str(),
                feature_set.as_str()
            );
        }

        Ok(Self {
            engine,
            validator: Validator::new(settings.validation.clone()),
            bands: settings.risk,
            schema: FormSchema::for_feature_set(feature_set),
            title: settings.ui.title.clone(),
            artifact_path: settings.model.artifact_path.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            prediction_count: AtomicU64::new(0),
            metrics,
        })
    }

    pub fn feature_set(&self) -> FeatureSet {
        self.engine.feature_set()
    }

    pub fn prediction_count(&self) -> u64 {
        self.prediction_count.load(Ordering::Relaxed)
    }

    /// Validate, assemble, score and classify one reading
    pub fn assess(&self, reading: &VehicleReading) -> Result<Assessment, AssessError> {
        if let Err(errors) = self.validator.validate(reading, self.feature_set()).into_result() {
            metrics::counter!("maintenance_rejections_total", "reason" => "validation").increment(1);
            return Err(AssessError::Invalid(errors));
        }

        let record = assemble(reading, self.feature_set());
        let inference = self.engine.predict(&record).map_err(|e| {
            warn!("Inference failed: {}", e);
            metrics::counter!("maintenance_rejections_total", "reason" => "inference").increment(1);
            e
        })?;

        let verdict = self.bands.assess(inference.probability);
        self.prediction_count.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("maintenance_predictions_total", "level" => verdict.level.as_str())
            .increment(1);
        metrics::histogram!("maintenance_inference_seconds").record(inference.latency.as_secs_f64());

        Ok(Assessment { verdict, inference })
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub model: ModelHealth,
    pub prediction_count: u64,
}

/// Loaded model summary
#[derive(Debug, Serialize)]
pub struct ModelHealth {
    pub name: String,
    pub classifier: String,
    pub feature_set: FeatureSet,
    pub artifact_path: String,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::form::show_form).post(routes::form::submit_form))
        .route("/api/v1/predict", post(routes::predictions::predict))
        .route("/api/v1/schema", get(routes::schema::get_schema))
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model: ModelHealth {
            name: state.engine.name().to_string(),
            classifier: state.engine.classifier_name().to_string(),
            feature_set: state.feature_set(),
            artifact_path: state.artifact_path.clone(),
        },
        prediction_count: state.prediction_count(),
    })
}

/// Prometheus scrape endpoint
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    let level: Level = settings
        .level
        .parse()
        .with_context(|| format!("invalid log level {:?}", settings.level))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.context("failed to set tracing subscriber")
}

/// Load the model, build state and run the server until it exits
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let engine = InferenceEngine::load(&settings.model.artifact_path)
        .with_context(|| format!("failed to load model artifact {}", settings.model.artifact_path))?;

    let metrics = if settings.metrics.enabled {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("failed to install metrics recorder")?,
        )
    } else {
        None
    };

    let state = Arc::new(AppState::new(&settings, Arc::new(engine), metrics)?);
    let app = create_router(state);

    info!("Starting server on {}", settings.server.addr);

    let listener = tokio::net::TcpListener::bind(&settings.server.addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.server.addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

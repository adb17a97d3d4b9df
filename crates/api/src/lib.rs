//! Smart-City Traffic API Server
//!
//! REST API for sensor ingestion, congestion prediction and alert listing.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use data_validator::Validator;
use inference_engine::{AdapterState, ArtifactLoader, OnnxArtifactLoader, PredictorService};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod settings;
mod error;
mod extract;
mod routes;

pub use settings::{AppConfig, LogFormat};
pub use error::ApiError;

use alerting::AlertHeuristic;
use storage::Repository;

/// Application state shared across handlers
pub struct AppState {
    /// Storage repository
    pub repository: Repository,
    /// Congestion predictor
    pub predictor: Arc<PredictorService>,
    /// Alert trigger evaluated after each ingested reading
    pub alert_heuristic: AlertHeuristic,
    /// Ingestion validator
    pub validator: Validator,
    /// Deployment environment label
    pub app_env: String,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus exposition handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: &AppConfig, repository: Repository, loader: Arc<dyn ArtifactLoader>) -> Self {
        Self {
            repository,
            predictor: Arc::new(PredictorService::new(config.predictor_config(), loader)),
            alert_heuristic: AlertHeuristic::new(config.alert_config()),
            validator: Validator::new(config.validation_config()),
            app_env: config.app_env.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub env: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    /// `None` until the first prediction initialises the model
    pub model_state: Option<AdapterState>,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/sensor", post(routes::sensors::ingest_sensor))
        .route("/api/predict", post(routes::predictions::predict))
        .route("/api/alerts", get(routes::alerts::get_alerts))
        .route("/api/dashboard", get(routes::dashboard::get_dashboard))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "ok".to_string(),
        env: state.app_env.clone(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model_state: state.predictor.adapter_state(),
    })
}

/// Prometheus exposition handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

/// Initialize logging
pub fn init_logging(
    level: &str,
    format: LogFormat,
) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let level = Level::from_str(level).unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    match format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
}

/// Run the server
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let repository = Repository::connect(&config.database_url).await?;
    let mut state = AppState::new(&config, repository, Arc::new(OnnxArtifactLoader));

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!("Prometheus recorder unavailable: {}", e),
    }

    let identity = state.predictor.identity();
    if config.eager_model_load {
        let mode = state.predictor.warm_up().await;
        info!(
            "Predictor {} {} ready ({})",
            identity.name,
            identity.version,
            mode.as_str()
        );
    } else {
        info!(
            "Predictor {} {} will load on first request",
            identity.name, identity.version
        );
    }

    let state = Arc::new(state);
    let app = create_router(state.clone());

    info!("Starting API server on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.repository.close().await;
    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}

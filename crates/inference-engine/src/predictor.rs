//! Predictor Service

use crate::adapter::{AdapterState, ModelAdapter};
use crate::model::ArtifactLoader;
use data_validator::PredictionRequest;
use fallback::HeuristicScorer;
use feature_engine::NormalizerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Declared model name, reported on every result
pub const MODEL_NAME: &str = "traffic_congestion";

/// Declared model version, reported on every result
pub const MODEL_VERSION: &str = "v1";

/// Name and version of the predictor, whatever scoring path is active
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIdentity {
    pub name: String,
    pub version: String,
}

impl Default for ModelIdentity {
    fn default() -> Self {
        Self {
            name: MODEL_NAME.to_string(),
            version: MODEL_VERSION.to_string(),
        }
    }
}

/// Result of a prediction
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub intersection_id: String,
    pub model_name: String,
    pub model_version: String,
    /// Congestion score in [0, 1]
    pub congestion_score: f64,
    /// Wall-clock time spent scoring
    pub processing_latency: Duration,
}

/// Predictor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Optional ONNX artifact; absence selects the heuristic
    pub artifact_path: PathBuf,
    /// Saturation constants for the heuristic path
    pub normalizer: NormalizerConfig,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("models/traffic_congestion.onnx"),
            normalizer: NormalizerConfig::default(),
        }
    }
}

/// Congestion predictor owning one lazily initialised [`ModelAdapter`]
///
/// Construct once at startup and share behind an `Arc`. Concurrent first
/// calls to [`PredictorService::predict`] wait on a single artifact load,
/// and a load started by a caller that is later dropped still completes.
pub struct PredictorService {
    config: PredictorConfig,
    identity: ModelIdentity,
    loader: Arc<dyn ArtifactLoader>,
    adapter: Arc<OnceLock<ModelAdapter>>,
}

impl PredictorService {
    /// Create a new predictor; nothing is loaded until first use
    pub fn new(config: PredictorConfig, loader: Arc<dyn ArtifactLoader>) -> Self {
        info!(
            "Creating predictor {} {} with artifact {}",
            MODEL_NAME,
            MODEL_VERSION,
            config.artifact_path.display()
        );
        Self {
            config,
            identity: ModelIdentity::default(),
            loader,
            adapter: Arc::new(OnceLock::new()),
        }
    }

    /// Get the predictor identity
    pub fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    /// Get the active scoring path, or `None` before first use
    pub fn adapter_state(&self) -> Option<AdapterState> {
        self.adapter.get().map(ModelAdapter::state)
    }

    /// Force adapter initialisation
    pub async fn warm_up(&self) -> AdapterState {
        self.adapter().await.state()
    }

    /// Score a request. Never fails.
    pub async fn predict(&self, request: &PredictionRequest) -> PredictionResult {
        let adapter = self.adapter().await;

        let start = Instant::now();
        let congestion_score = adapter.score(request);
        let processing_latency = start.elapsed();

        debug!(
            "Predicted {:.4} for {} via {} in {:?}",
            congestion_score,
            request.intersection_id,
            adapter.state().as_str(),
            processing_latency
        );

        PredictionResult {
            intersection_id: request.intersection_id.clone(),
            model_name: self.identity.name.clone(),
            model_version: self.identity.version.clone(),
            congestion_score,
            processing_latency,
        }
    }

    async fn adapter(&self) -> &ModelAdapter {
        if let Some(adapter) = self.adapter.get() {
            return adapter;
        }

        let cell = Arc::clone(&self.adapter);
        let path = self.config.artifact_path.clone();
        let loader = Arc::clone(&self.loader);
        let heuristic = HeuristicScorer::new(self.config.normalizer);

        // The blocking task owns the initialisation, so it runs to completion
        // even if this future is dropped. Later callers block on the same cell.
        let outcome = tokio::task::spawn_blocking(move || {
            cell.get_or_init(|| ModelAdapter::initialize(&path, loader.as_ref(), heuristic));
        })
        .await;

        if let Err(e) = outcome {
            warn!("Model initialisation task failed: {}; using heuristic", e);
        }
        self.adapter
            .get_or_init(|| ModelAdapter::heuristic(heuristic))
    }
}

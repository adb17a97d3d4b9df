//! Prediction Routes

use axum::{extract::State, Json};
use data_validator::PredictPayload;
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::AppState;

/// Response for the prediction endpoint
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub intersection_id: String,
    pub model_name: String,
    pub model_version: String,
    pub congestion_score: f64,
    pub processing_ms: f64,
}

/// Score congestion for an intersection
pub async fn predict(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<PredictPayload>,
) -> Result<Json<PredictResponse>, ApiError> {
    let request = payload.resolve();
    let result = state.predictor.predict(&request).await;

    let processing_ms = result.processing_latency.as_secs_f64() * 1000.0;
    let path = state
        .predictor
        .adapter_state()
        .map(|s| s.as_str())
        .unwrap_or("unknown");
    metrics::counter!("predictions_total", "path" => path).increment(1);
    metrics::histogram!("prediction_latency_ms").record(processing_ms);

    Ok(Json(PredictResponse {
        intersection_id: result.intersection_id,
        model_name: result.model_name,
        model_version: result.model_version,
        congestion_score: result.congestion_score,
        processing_ms,
    }))
}

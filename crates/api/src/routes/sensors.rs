//! Sensor Routes

use axum::{extract::State, Json};
use data_validator::SensorPayload;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::AppState;

/// Response for the ingestion endpoint
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub id: i64,
    /// Set when the latest reading crossed the alert threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<i64>,
}

/// Ingest a sensor reading, then evaluate the alert heuristic on the most
/// recent stored reading
pub async fn ingest_sensor(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<SensorPayload>,
) -> Result<Json<IngestResponse>, ApiError> {
    let reading = state.validator.validate_sensor(payload)?;
    let id = state.repository.insert_reading(&reading).await?;
    metrics::counter!("sensor_readings_total").increment(1);

    let mut alert_id = None;
    if let Some(latest) = state.repository.latest_reading().await? {
        if let Some(alert) = state.alert_heuristic.evaluate(&latest) {
            alert_id = Some(state.repository.insert_alert(&alert).await?);
            metrics::counter!("alerts_total", "level" => alert.level.as_str()).increment(1);
        }
    }

    debug!("Accepted reading {} (alert: {:?})", id, alert_id);
    Ok(Json(IngestResponse {
        status: "accepted",
        id,
        alert_id,
    }))
}

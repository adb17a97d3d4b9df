//! Dashboard Routes

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;
use storage::DashboardSummary;

/// Aggregate reading statistics
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardSummary>, ApiError> {
    Ok(Json(state.repository.dashboard_summary().await?))
}

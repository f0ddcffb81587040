//! Health check endpoint handler

use axum::{extract::State, Json};

use crate::models::HealthResponse;
use crate::routes::AppState;

/// Handler for GET /health
///
/// Returns service status and the number of loaded tools.
pub async fn health(State(app_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        tool_count: app_state.index.len(),
    })
}

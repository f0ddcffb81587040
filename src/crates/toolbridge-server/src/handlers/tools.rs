//! Tool listing and lookup endpoint handlers

use axum::{
    extract::{Path, State},
    Json,
};
use toolbridge_spec::ToolDescriptor;

use crate::error::{ApiError, ApiResult};
use crate::models::ToolSummary;
use crate::routes::AppState;

/// List all compiled tools
///
/// GET /api/v1/tools
pub async fn list_tools(State(app_state): State<AppState>) -> Json<Vec<ToolSummary>> {
    let summaries = app_state
        .index
        .tools()
        .iter()
        .map(|tool| ToolSummary::from_tool(tool))
        .collect();
    Json(summaries)
}

/// Fetch one tool's full descriptor, including its input schema
///
/// GET /api/v1/tools/:name
pub async fn get_tool(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ToolDescriptor>> {
    let tool = app_state
        .index
        .by_name(&name)
        .ok_or_else(|| ApiError::NotFound(format!("tool '{name}'")))?;
    Ok(Json(tool.as_ref().clone()))
}

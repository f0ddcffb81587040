//! Chat turn endpoint handler

use axum::{extract::State, Json};
use toolbridge_dialogue::TurnResponse;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::ChatRequest;
use crate::routes::AppState;

/// Process one chat turn
///
/// POST /api/v1/chat
///
/// Omitting `conversation_id` starts a new conversation; its generated id
/// comes back in the response for follow-up turns.
pub async fn chat(
    State(app_state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<TurnResponse>> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let conversation_id = request
        .conversation_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let response = app_state
        .engine
        .handle_turn(&conversation_id, &request.message)
        .await?;

    tracing::info!(
        conversation = %conversation_id,
        state = ?response.state,
        "chat turn processed"
    );
    Ok(Json(response))
}

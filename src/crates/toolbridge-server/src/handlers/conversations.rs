//! Conversation listing, inspection, and deletion endpoint handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use toolbridge_dialogue::ConversationSummary;

use crate::error::{ApiError, ApiResult};
use crate::models::ConversationDetail;
use crate::routes::AppState;

/// List stored conversations, most recently active first
///
/// GET /api/v1/conversations
pub async fn list_conversations(
    State(app_state): State<AppState>,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    let summaries = app_state.store.list().await?;
    Ok(Json(summaries))
}

/// Fetch one conversation's transcript and slot-filling state
///
/// GET /api/v1/conversations/:id
pub async fn get_conversation(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConversationDetail>> {
    let conversation = app_state
        .store
        .load(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("conversation '{id}'")))?;
    Ok(Json(ConversationDetail::from_conversation(&conversation)))
}

/// Delete a conversation; unknown ids are a no-op
///
/// DELETE /api/v1/conversations/:id
pub async fn delete_conversation(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    app_state.store.delete(&id).await?;
    tracing::info!(conversation = %id, "conversation deleted");
    Ok(StatusCode::NO_CONTENT)
}

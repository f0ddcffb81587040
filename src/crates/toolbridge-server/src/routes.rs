//! API route definitions
//!
//! Defines all API routes and their associated handler functions.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use toolbridge_dialogue::{ConversationStore, SlotFillingEngine};
use toolbridge_match::ToolIndex;

use crate::handlers;
use crate::middleware::{cors_layer, logging_layer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Dialogue engine driving chat turns
    pub engine: Arc<SlotFillingEngine>,
    /// Compiled tool index, for listing and lookup
    pub index: Arc<ToolIndex>,
    /// Conversation store, shared with the engine
    pub store: Arc<dyn ConversationStore>,
}

/// Build the complete API router
pub fn create_router(
    engine: Arc<SlotFillingEngine>,
    index: Arc<ToolIndex>,
    store: Arc<dyn ConversationStore>,
) -> Router {
    let app_state = AppState {
        engine,
        index,
        store,
    };

    Router::new()
        // Health check endpoint
        .route("/health", get(handlers::health))
        // Tool endpoints
        .route("/api/v1/tools", get(handlers::list_tools))
        .route("/api/v1/tools/:name", get(handlers::get_tool))
        // Chat endpoint
        .route("/api/v1/chat", post(handlers::chat))
        // Conversation endpoints
        .route("/api/v1/conversations", get(handlers::list_conversations))
        .route(
            "/api/v1/conversations/:id",
            get(handlers::get_conversation).delete(handlers::delete_conversation),
        )
        .layer(logging_layer())
        .layer(cors_layer())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolbridge_dialogue::InMemoryConversationStore;
    use toolbridge_exec::ReqwestTransport;
    use toolbridge_match::MatchEngine;
    use std::time::Duration;

    #[test]
    fn test_router_creation() {
        let index = Arc::new(ToolIndex::build(Vec::new()));
        let matcher = Arc::new(MatchEngine::new(index.clone()));
        let store: Arc<InMemoryConversationStore> =
            Arc::new(InMemoryConversationStore::new());
        let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap());
        let engine = Arc::new(SlotFillingEngine::new(matcher, transport, store.clone()));

        let _router = create_router(engine, index, store);
    }
}

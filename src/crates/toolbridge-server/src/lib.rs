//! # toolbridge-server - REST API Server
//!
//! HTTP surface over the toolbridge pipeline:
//! - Tool listing and lookup
//! - Chat turns against the slot-filling dialogue engine
//! - Conversation inspection and deletion
//! - Health check

use std::net::SocketAddr;
use std::sync::Arc;
use toolbridge_dialogue::{ConversationStore, SlotFillingEngine};
use toolbridge_match::ToolIndex;

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use routes::{create_router, AppState};

/// Bind and run the API server until Ctrl-C or SIGTERM
pub async fn serve(
    addr: SocketAddr,
    engine: Arc<SlotFillingEngine>,
    index: Arc<ToolIndex>,
    store: Arc<dyn ConversationStore>,
) -> std::io::Result<()> {
    let app = create_router(engine, index, store);

    tracing::info!("Starting toolbridge server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Toolbridge server shut down gracefully");
    Ok(())
}

/// Signal for graceful shutdown (Ctrl-C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! Error types for dialogue operations

use thiserror::Error;

/// Result type for dialogue operations
pub type Result<T> = std::result::Result<T, DialogueError>;

/// Errors that can occur in the dialogue layer
///
/// The state machine itself never fails a turn: matching misses,
/// validation rejections, and execution failures all become assistant
/// messages. These variants cover the persistence boundary.
#[derive(Debug, Error)]
pub enum DialogueError {
    /// Conversation store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! Error types for embedding and vector store operations.

use thiserror::Error;

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur when working with embedding providers and stores.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API key not found in environment.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// Provider returned an unusable response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Provider is unreachable or refused the request.
    ///
    /// Callers treat this as "embeddings unavailable" and fall back to a
    /// neutral semantic signal rather than failing their own operation.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Vector dimensionality did not match the store.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Storage error.
    #[error("Store error: {0}")]
    Store(String),
}

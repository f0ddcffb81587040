//! Error types for specification compilation

use thiserror::Error;

/// Result type for specification operations
pub type Result<T> = std::result::Result<T, SpecError>;

/// Errors that can occur while loading or compiling a specification
///
/// Note that a malformed *operation* inside an otherwise valid document is
/// never an error: the compiler skips it and logs a warning. These variants
/// cover failures that prevent reading the document at all.
#[derive(Error, Debug)]
pub enum SpecError {
    /// Document is not valid JSON
    #[error("Invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    /// Document is not valid YAML
    #[error("Invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Document parsed but is not an OpenAPI/Swagger specification
    #[error("Invalid specification document: {0}")]
    InvalidDocument(String),
}

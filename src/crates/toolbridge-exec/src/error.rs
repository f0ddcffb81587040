//! Error types for command synthesis and execution

use thiserror::Error;

/// Result type for synthesis and transport operations
pub type Result<T> = std::result::Result<T, ExecError>;

/// Errors that can occur while synthesizing or sending a request
///
/// Transport-level failures and non-2xx responses are deliberately *not*
/// errors at the execution boundary: they are folded into an
/// [`ExecutionResult`](crate::ExecutionResult) so the dialogue can surface
/// them and stay alive. These variants cover failures before a request can
/// be attempted at all.
#[derive(Debug, Error)]
pub enum ExecError {
    /// A `{placeholder}` in the path has no corresponding parameter.
    #[error("Missing path parameter: {0}")]
    MissingPathParameter(String),

    /// HTTP client could not be constructed or the request was invalid.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Method string could not be mapped to an HTTP method.
    #[error("Invalid method: {0}")]
    InvalidMethod(String),
}

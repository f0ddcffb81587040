//! # toolbridge-exec - Command Synthesis and Execution
//!
//! The final step of the pipeline: turn a matched tool plus its collected
//! parameters into a structured HTTP request ([`synthesize`]), render it
//! for humans ([`to_curl_string`]), and send it through a [`Transport`]
//! ([`execute`]). Execution never throws past the boundary; every failure
//! mode is folded into an [`ExecutionResult`] so the dialogue stays alive.

pub mod error;
pub mod synthesizer;
pub mod transport;

pub use error::{ExecError, Result};
pub use synthesizer::{synthesize, to_curl_string, HttpRequestSpec};
pub use transport::{execute, ExecutionResult, HttpResponse, ReqwestTransport, Transport};

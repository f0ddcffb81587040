//! Transport boundary
//!
//! The [`Transport`] trait performs one HTTP request and reports what came
//! back; [`execute`] wraps synthesis plus transport into an
//! [`ExecutionResult`] that never propagates an error past the boundary:
//! transport failures and non-2xx statuses are folded into the result so
//! the dialogue engine can render them and keep the conversation alive.

use crate::error::{ExecError, Result};
use crate::synthesizer::{synthesize, HttpRequestSpec};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use toolbridge_spec::ToolDescriptor;
use tracing::{debug, warn};

/// Raw response from a transport
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Raw response body
    pub body: String,
}

/// Performs an HTTP request and returns status and body
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request; errors only on transport-level failures
    /// (connection refused, timeout), never on HTTP error statuses.
    async fn send(&self, request: &HttpRequestSpec) -> Result<HttpResponse>;
}

/// Outcome of executing a synthesized command
///
/// `success` is true only for a 2xx response. Failed synthesis, transport
/// errors, and error statuses all land in `error` with the conversation
/// left intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the call completed with a 2xx status
    pub success: bool,
    /// HTTP status code, when a response was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Response body, parsed as JSON when possible
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Failure description, when the call did not succeed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Synthesize and execute a tool call
///
/// Never returns an error: every failure mode becomes an unsuccessful
/// [`ExecutionResult`].
pub async fn execute(
    transport: &dyn Transport,
    tool: &ToolDescriptor,
    parameters: &BTreeMap<String, Value>,
) -> ExecutionResult {
    let request = match synthesize(tool, parameters) {
        Ok(request) => request,
        Err(e) => {
            warn!(tool = %tool.name, error = %e, "command synthesis failed");
            return ExecutionResult {
                success: false,
                status_code: None,
                body: None,
                error: Some(e.to_string()),
            };
        }
    };

    debug!(tool = %tool.name, method = %request.method, url = %request.url, "executing command");
    match transport.send(&request).await {
        Ok(response) => {
            let body = if response.body.is_empty() {
                None
            } else {
                Some(
                    serde_json::from_str(&response.body)
                        .unwrap_or(Value::String(response.body.clone())),
                )
            };
            let success = (200..300).contains(&response.status);
            ExecutionResult {
                success,
                status_code: Some(response.status),
                body,
                error: if success {
                    None
                } else {
                    Some(format!("HTTP {}", response.status))
                },
            }
        }
        Err(e) => {
            warn!(tool = %tool.name, error = %e, "transport failure");
            ExecutionResult {
                success: false,
                status_code: None,
                body: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// reqwest-backed transport with a bounded request duration
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        // A 30s bound mirrors typical API gateway limits.
        Self::new(Duration::from_secs(30)).expect("default HTTP client construction")
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequestSpec) -> Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|_| ExecError::InvalidMethod(request.method.as_str().to_string()))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolbridge_spec::SpecCompiler;

    struct StubTransport {
        status: u16,
        body: String,
        fail: bool,
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn send(&self, _request: &HttpRequestSpec) -> Result<HttpResponse> {
            if self.fail {
                return Err(ExecError::InvalidMethod("stub failure".to_string()));
            }
            Ok(HttpResponse {
                status: self.status,
                headers: BTreeMap::new(),
                body: self.body.clone(),
            })
        }
    }

    fn delete_pet() -> ToolDescriptor {
        SpecCompiler::compile(&json!({
            "openapi": "3.0.0",
            "servers": [{ "url": "https://petstore.example.com/v2" }],
            "paths": {
                "/pets/{id}": {
                    "delete": {
                        "operationId": "deletePet",
                        "parameters": [
                            { "name": "id", "in": "path", "schema": { "type": "integer" } }
                        ]
                    }
                }
            }
        }))
        .remove(0)
    }

    #[tokio::test]
    async fn test_execute_success_parses_json_body() {
        let transport = StubTransport {
            status: 200,
            body: r#"{"deleted": true}"#.to_string(),
            fail: false,
        };
        let mut params = BTreeMap::new();
        params.insert("id".to_string(), json!(7));

        let result = execute(&transport, &delete_pet(), &params).await;

        assert!(result.success);
        assert_eq!(result.status_code, Some(200));
        assert_eq!(result.body, Some(json!({ "deleted": true })));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_execute_non_2xx_reported_not_thrown() {
        let transport = StubTransport {
            status: 404,
            body: "not found".to_string(),
            fail: false,
        };
        let mut params = BTreeMap::new();
        params.insert("id".to_string(), json!(7));

        let result = execute(&transport, &delete_pet(), &params).await;

        assert!(!result.success);
        assert_eq!(result.status_code, Some(404));
        assert_eq!(result.error.as_deref(), Some("HTTP 404"));
        assert_eq!(result.body, Some(json!("not found")));
    }

    #[tokio::test]
    async fn test_execute_transport_failure_reported() {
        let transport = StubTransport {
            status: 0,
            body: String::new(),
            fail: true,
        };
        let mut params = BTreeMap::new();
        params.insert("id".to_string(), json!(7));

        let result = execute(&transport, &delete_pet(), &params).await;

        assert!(!result.success);
        assert!(result.status_code.is_none());
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_execute_synthesis_failure_reported() {
        let transport = StubTransport {
            status: 200,
            body: String::new(),
            fail: false,
        };

        // No `id` parameter for the path placeholder.
        let result = execute(&transport, &delete_pet(), &BTreeMap::new()).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("id"));
    }
}

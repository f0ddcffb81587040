//! Command synthesis
//!
//! Converts a tool descriptor plus a resolved parameter map into a concrete
//! HTTP request: path placeholders are substituted with percent-encoded
//! values, and the remaining parameters split into query string or JSON
//! body depending on the method. Placeholder sentinel values that slip in
//! from schema examples ("string", "unknown", ...) are filtered out before
//! synthesis so they are never sent as real arguments.

use crate::error::{ExecError, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use toolbridge_spec::{HttpMethod, ToolDescriptor};

/// Characters escaped inside a path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

/// Characters escaped inside a query component
const QUERY: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'&')
    .add(b'=')
    .add(b'+')
    .add(b'%');

/// Values treated as schema-example placeholders, never sent
const SENTINELS: &[&str] = &["string", "", "unknown", "n/a"];

/// A fully synthesized HTTP request, ready for a transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestSpec {
    /// HTTP method
    pub method: HttpMethod,
    /// Absolute URL with path parameters substituted and query appended
    pub url: String,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// JSON request body, when the method carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Synthesize an HTTP request from a tool and its collected parameters
pub fn synthesize(
    tool: &ToolDescriptor,
    parameters: &BTreeMap<String, Value>,
) -> Result<HttpRequestSpec> {
    let mut working: BTreeMap<String, Value> = parameters
        .iter()
        .filter(|(_, value)| !is_sentinel(value))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let method = tool.endpoint.method;
    let mut url = format!(
        "{}{}",
        tool.endpoint.base_url.trim_end_matches('/'),
        tool.endpoint.path
    );

    // Substitute {name} placeholders; consumed parameters leave the
    // working set so they are not duplicated into query or body.
    for placeholder in path_placeholders(&tool.endpoint.path) {
        let value = working
            .remove(&placeholder)
            .ok_or_else(|| ExecError::MissingPathParameter(placeholder.clone()))?;
        let encoded =
            utf8_percent_encode(&value_to_string(&value), PATH_SEGMENT).to_string();
        url = url.replace(&format!("{{{placeholder}}}"), &encoded);
    }

    let mut headers = BTreeMap::new();
    headers.insert("Accept".to_string(), "application/json".to_string());

    let body = if method.uses_query_parameters() {
        if !working.is_empty() {
            let query: Vec<String> = working
                .iter()
                .map(|(name, value)| {
                    format!(
                        "{}={}",
                        utf8_percent_encode(name, QUERY),
                        utf8_percent_encode(&value_to_string(value), QUERY)
                    )
                })
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        None
    } else if working.is_empty() {
        None
    } else {
        let mut object = Map::new();
        for (name, value) in working {
            object.insert(name, value);
        }
        Some(Value::Object(object))
    };

    if body.is_some() {
        headers.insert("Content-Type".to_string(), "application/json".to_string());
    }

    Ok(HttpRequestSpec {
        method,
        url,
        headers,
        body,
    })
}

/// Render a request as a copy-pasteable curl command
pub fn to_curl_string(request: &HttpRequestSpec) -> String {
    let mut command = format!("curl -X {} '{}'", request.method, request.url);
    for (name, value) in &request.headers {
        command.push_str(&format!(" -H '{}: {}'", name, value));
    }
    if let Some(body) = &request.body {
        command.push_str(&format!(" -d '{}'", body));
    }
    command
}

/// `{name}` placeholders of a path template, in order
fn path_placeholders(path: &str) -> Vec<String> {
    let mut placeholders = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        placeholders.push(rest[start + 1..start + end].to_string());
        rest = &rest[start + end + 1..];
    }
    placeholders
}

/// Whether a value is a schema-example placeholder
fn is_sentinel(value: &Value) -> bool {
    match value {
        Value::String(s) => SENTINELS.contains(&s.trim().to_lowercase().as_str()),
        Value::Null => true,
        _ => false,
    }
}

/// Parameter value rendered for a URL component
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

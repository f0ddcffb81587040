//! Tool descriptor data model
//!
//! A [`ToolDescriptor`] is the normalized record describing one callable API
//! operation: its name, description, input schema, endpoint, and security
//! requirements. Descriptors are produced once by the compiler and never
//! mutated afterwards; downstream components (the match engine, the dialogue
//! engine, the command synthesizer) hold shared references to them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// HTTP methods the compiler recognizes on a path item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    /// All methods the compiler walks, in a fixed order
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    /// Lowercase method name as it appears as a path-item key
    pub fn as_key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
        }
    }

    /// Uppercase method name for request synthesis
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Whether the method is considered read-only (GET/HEAD)
    pub fn is_read_only(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head)
    }

    /// Whether parameters ride in the query string rather than a body
    pub fn uses_query_parameters(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head | HttpMethod::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flattened JSON Schema for a single input field
///
/// The resolver has already dereferenced `$ref` and merged composition
/// keywords by the time a schema becomes a `FieldSchema`, so this type only
/// needs to model the flat shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// JSON Schema `type` (string, integer, number, boolean, array, object)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,

    /// Human-readable field description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared value format (int64, date-time, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Closed set of allowed values, when declared
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    /// Example value from the specification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,

    /// Default value from the specification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Item schema for array fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldSchema>>,

    /// Nested properties for object fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, FieldSchema>>,

    /// Required property names for object fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl FieldSchema {
    /// Allowed values rendered as strings, for prompts and validation
    pub fn enum_strings(&self) -> Option<Vec<String>> {
        self.enum_values.as_ref().map(|values| {
            values
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
    }
}

/// Input schema of a tool: an ordered field map plus the required-name list
///
/// `required` preserves declaration order so that "the next missing field"
/// is deterministic across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    /// Field name to schema, ordered by name
    pub properties: BTreeMap<String, FieldSchema>,
    /// Names of required fields, in declaration order
    pub required: Vec<String>,
}

impl InputSchema {
    /// Whether a field of this name is declared
    pub fn has_field(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Whether a field is required
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Names of declared optional fields, in property order
    pub fn optional_fields(&self) -> Vec<&str> {
        self.properties
            .keys()
            .filter(|name| !self.is_required(name))
            .map(String::as_str)
            .collect()
    }
}

/// Where and how a tool's operation is invoked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// HTTP method of the operation
    pub method: HttpMethod,
    /// Path template with `{param}` placeholders
    pub path: String,
    /// Server base URL, possibly empty when the document declares none
    pub base_url: String,
}

/// Descriptive hints attached to a compiled tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolAnnotations {
    /// HTTP method, duplicated here for display surfaces
    pub method: String,
    /// Path template
    pub path: String,
    /// Specification tags on the operation
    pub tags: Vec<String>,
    /// Whether the operation is marked deprecated
    pub deprecated: bool,
    /// True for GET/HEAD operations
    pub read_only_hint: bool,
    /// Tools call out to an external API, so the world is open
    pub open_world_hint: bool,
}

/// One security requirement: scheme name to required scopes
pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

/// Normalized record describing one callable API operation
///
/// Immutable once compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name within one compiled document
    pub name: String,
    /// Operation summary or description
    pub description: String,
    /// Flattened input schema covering parameters and request body
    pub input_schema: InputSchema,
    /// Invocation endpoint
    pub endpoint: Endpoint,
    /// Alternative security requirements (any one suffices)
    pub security: Vec<SecurityRequirement>,
    /// Display and routing hints
    pub annotations: ToolAnnotations,
}

impl ToolDescriptor {
    /// Text used for keyword indexing and embedding: name, description, tags
    pub fn index_text(&self) -> String {
        let mut text = format!("{} {}", self.name, self.description);
        for tag in &self.annotations.tags {
            text.push(' ');
            text.push_str(tag);
        }
        text
    }
}

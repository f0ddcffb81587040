//! Specification compiler
//!
//! Walks every path × method pair of an OpenAPI 3.x or Swagger 2.0 document
//! and emits one [`ToolDescriptor`] per operation. Compilation never fails
//! for a whole document: a malformed operation is skipped and logged, and
//! schema problems degrade to partial schemas via the resolver's soft-fail
//! behavior.

use crate::descriptor::{
    Endpoint, FieldSchema, HttpMethod, InputSchema, SecurityRequirement, ToolAnnotations,
    ToolDescriptor,
};
use crate::error::{Result, SpecError};
use crate::resolver::resolve_schema;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Compiles specification documents into tool descriptors
pub struct SpecCompiler;

impl SpecCompiler {
    /// Compile a document from a JSON string
    pub fn from_json_str(input: &str) -> Result<Vec<ToolDescriptor>> {
        let document: Value = serde_json::from_str(input)?;
        Self::check_root(&document)?;
        Ok(Self::compile(&document))
    }

    /// Compile a document from a YAML string
    pub fn from_yaml_str(input: &str) -> Result<Vec<ToolDescriptor>> {
        let document: Value = serde_yaml::from_str(input)?;
        Self::check_root(&document)?;
        Ok(Self::compile(&document))
    }

    /// A parsed scalar or array cannot be a specification document
    fn check_root(document: &Value) -> Result<()> {
        if document.is_object() {
            Ok(())
        } else {
            Err(SpecError::InvalidDocument(
                "document root is not an object".to_string(),
            ))
        }
    }

    /// Compile an already-parsed document
    ///
    /// Never errors: operations that cannot be compiled are skipped with a
    /// warning, and a document without usable paths compiles to an empty
    /// tool set.
    pub fn compile(document: &Value) -> Vec<ToolDescriptor> {
        let base_url = determine_base_url(document);
        debug!(%base_url, "compiling specification document");

        let paths = match document.get("paths").and_then(Value::as_object) {
            Some(paths) => paths,
            None => {
                warn!("document has no paths object, compiling empty tool set");
                return Vec::new();
            }
        };

        let mut tools: Vec<ToolDescriptor> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for (path, path_item) in paths {
            let path_item = match path_item.as_object() {
                Some(item) => item,
                None => {
                    warn!(path, "path item is not an object, skipping");
                    continue;
                }
            };
            let path_parameters: Vec<Value> = path_item
                .get("parameters")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            for method in HttpMethod::ALL {
                let operation = match path_item.get(method.as_key()) {
                    Some(op) => op,
                    None => continue,
                };
                let operation = match operation.as_object() {
                    Some(op) => op,
                    None => {
                        warn!(path, method = method.as_str(), "malformed operation, skipping");
                        continue;
                    }
                };

                let tool = compile_operation(
                    document,
                    &base_url,
                    path,
                    method,
                    operation,
                    &path_parameters,
                );

                // Duplicate names silently overwrite in the source; kept
                // last-wins, surfaced as a warning.
                match by_name.get(&tool.name) {
                    Some(&index) => {
                        warn!(name = %tool.name, "duplicate tool name, last compiled wins");
                        tools[index] = tool;
                    }
                    None => {
                        by_name.insert(tool.name.clone(), tools.len());
                        tools.push(tool);
                    }
                }
            }
        }

        info!(count = tools.len(), "compiled tool descriptors");
        tools
    }
}

/// Base URL resolution: v3 `servers[0].url` with variable defaults
/// substituted, v2 `scheme://host + basePath`, else empty
fn determine_base_url(document: &Value) -> String {
    if let Some(server) = document
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first())
    {
        let mut url = server
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if let Some(variables) = server.get("variables").and_then(Value::as_object) {
            for (name, variable) in variables {
                if let Some(default) = variable.get("default").and_then(Value::as_str) {
                    url = url.replace(&format!("{{{name}}}"), default);
                }
            }
        }
        return url;
    }

    if let Some(host) = document.get("host").and_then(Value::as_str) {
        let scheme = document
            .get("schemes")
            .and_then(Value::as_array)
            .and_then(|schemes| schemes.first())
            .and_then(Value::as_str)
            .unwrap_or("https");
        let base_path = document
            .get("basePath")
            .and_then(Value::as_str)
            .unwrap_or("");
        return format!("{scheme}://{host}{base_path}");
    }

    String::new()
}

fn compile_operation(
    document: &Value,
    base_url: &str,
    path: &str,
    method: HttpMethod,
    operation: &Map<String, Value>,
    path_parameters: &[Value],
) -> ToolDescriptor {
    let name = operation
        .get("operationId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| sanitized_name(method, path));

    let description = operation
        .get("summary")
        .or_else(|| operation.get("description"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} {}", method.as_str(), path));

    let mut input_schema = InputSchema::default();

    // Path-level parameters first, operation-level second: on a name
    // collision the operation-level definition wins.
    let operation_parameters: Vec<Value> = operation
        .get("parameters")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for parameter in path_parameters.iter().chain(operation_parameters.iter()) {
        add_parameter(document, &mut input_schema, parameter, &name);
    }

    if let Some(request_body) = operation.get("requestBody") {
        add_request_body(document, &mut input_schema, request_body);
    }

    let tags = operation
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let security = operation
        .get("security")
        .or_else(|| document.get("security"))
        .and_then(|s| serde_json::from_value::<Vec<SecurityRequirement>>(s.clone()).ok())
        .unwrap_or_default();

    ToolDescriptor {
        name,
        description,
        input_schema,
        endpoint: Endpoint {
            method,
            path: path.to_string(),
            base_url: base_url.to_string(),
        },
        security,
        annotations: ToolAnnotations {
            method: method.as_str().to_string(),
            path: path.to_string(),
            tags,
            deprecated: operation.get("deprecated").and_then(Value::as_bool) == Some(true),
            read_only_hint: method.is_read_only(),
            open_world_hint: true,
        },
    }
}

/// Fallback tool name when the operation has no operationId:
/// `{method}_{path}` with non-alphanumerics replaced by `_`
fn sanitized_name(method: HttpMethod, path: &str) -> String {
    let sanitized: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_{}", method.as_key(), sanitized)
}

/// Fold one parameter into the input schema
///
/// Path, query, and header parameters become top-level properties. A v2
/// `in: body` parameter carries a full schema and is merged like a v3
/// request body. A parameter without a name is malformed and skipped.
fn add_parameter(document: &Value, input_schema: &mut InputSchema, parameter: &Value, tool: &str) {
    let resolved_parameter;
    let parameter = if parameter.get("$ref").is_some() {
        resolved_parameter = resolve_schema(parameter, document);
        &resolved_parameter
    } else {
        parameter
    };

    let name = match parameter.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name,
        _ => {
            warn!(tool, "parameter without a name, skipping");
            return;
        }
    };
    let location = parameter
        .get("in")
        .and_then(Value::as_str)
        .unwrap_or("query");

    if location == "body" {
        // Swagger 2.0 body parameter.
        if let Some(schema) = parameter.get("schema") {
            merge_body_schema(
                document,
                input_schema,
                schema,
                parameter.get("required").and_then(Value::as_bool) == Some(true),
            );
        }
        return;
    }
    if !matches!(location, "path" | "query" | "header") {
        debug!(tool, name, location, "unsupported parameter location, skipping");
        return;
    }

    let mut field = match parameter.get("schema") {
        // OpenAPI 3.x: parameter carries a schema object.
        Some(schema) => to_field_schema(&resolve_schema(schema, document)),
        // Swagger 2.0: type/format/enum live on the parameter itself,
        // alongside non-schema keys like `required` that must not leak in.
        None => {
            let mut inline = Map::new();
            for key in ["type", "format", "enum", "items", "default", "example"] {
                if let Some(value) = parameter.get(key) {
                    inline.insert(key.to_string(), value.clone());
                }
            }
            to_field_schema(&Value::Object(inline))
        }
    };
    if field.description.is_none() {
        field.description = parameter
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
    }

    // Path parameters are always required, whatever the document says.
    let required =
        location == "path" || parameter.get("required").and_then(Value::as_bool) == Some(true);

    input_schema.properties.insert(name.to_string(), field);
    if required && !input_schema.required.iter().any(|r| r == name) {
        input_schema.required.push(name.to_string());
    }
}

/// Fold an OpenAPI 3.x request body into the input schema
fn add_request_body(document: &Value, input_schema: &mut InputSchema, request_body: &Value) {
    let resolved_body;
    let request_body = if request_body.get("$ref").is_some() {
        resolved_body = resolve_schema(request_body, document);
        &resolved_body
    } else {
        request_body
    };

    let content = match request_body.get("content").and_then(Value::as_object) {
        Some(content) => content,
        None => return,
    };
    let schema = content
        .get("application/json")
        .or_else(|| content.values().next())
        .and_then(|media| media.get("schema"));
    let schema = match schema {
        Some(schema) => schema,
        None => return,
    };

    let body_required = request_body.get("required").and_then(Value::as_bool) == Some(true);
    merge_body_schema(document, input_schema, schema, body_required);
}

/// Merge a body schema into the top level of the input schema
///
/// Object bodies contribute their properties directly; a non-object body is
/// nested under a single synthetic `body` property.
fn merge_body_schema(
    document: &Value,
    input_schema: &mut InputSchema,
    schema: &Value,
    body_required: bool,
) {
    let resolved = resolve_schema(schema, document);

    let is_object = resolved.get("type").and_then(Value::as_str) == Some("object")
        || resolved.get("properties").is_some();
    if is_object {
        if let Some(properties) = resolved.get("properties").and_then(Value::as_object) {
            for (name, prop) in properties {
                input_schema
                    .properties
                    .insert(name.clone(), to_field_schema(prop));
            }
        }
        if let Some(required) = resolved.get("required").and_then(Value::as_array) {
            for req in required.iter().filter_map(Value::as_str) {
                if !input_schema.required.iter().any(|r| r == req) {
                    input_schema.required.push(req.to_string());
                }
            }
        }
    } else {
        input_schema
            .properties
            .insert("body".to_string(), to_field_schema(&resolved));
        if body_required && !input_schema.required.iter().any(|r| r == "body") {
            input_schema.required.push("body".to_string());
        }
    }
}

/// Convert a resolved schema value into a field schema, tolerating shapes
/// the model does not cover
fn to_field_schema(value: &Value) -> FieldSchema {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

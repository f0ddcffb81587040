//! Schema resolution
//!
//! Flattens the indirection OpenAPI documents use inside schemas: `$ref`
//! pointers are dereferenced against the root document, and the composition
//! keywords `allOf`/`anyOf`/`oneOf` are merged into one synthetic object
//! schema. Resolution fails soft: an unresolvable reference yields an empty
//! schema object rather than an error, so callers must tolerate partial
//! schemas.
//!
//! The merge treats all three composition keywords identically: branch
//! `properties` are unioned with later branches overwriting earlier ones on
//! key collision, and `required` arrays are concatenated and de-duplicated.
//! That is not strict JSON-Schema semantics for `anyOf`/`oneOf`, which name
//! alternatives rather than fragments; it is a deliberate simplification
//! kept from the original behavior.

use serde_json::{json, Map, Value};
use tracing::warn;

/// Upper bound on schema nesting the resolver will follow
///
/// Self-referential schemas (e.g. a `Node` whose children are `Node`s) would
/// otherwise recurse forever. Past the limit a sub-schema resolves to the
/// empty schema, the same soft-fail used for an unresolvable `$ref`.
pub const MAX_RESOLVE_DEPTH: usize = 32;

/// Resolve a schema fragment into a flat schema
///
/// `document` must be the root of the specification the fragment came from,
/// since `$ref` pointers are document-absolute (`#/components/schemas/Pet`).
pub fn resolve_schema(schema: &Value, document: &Value) -> Value {
    resolve_at(schema, document, 0)
}

fn resolve_at(schema: &Value, document: &Value, depth: usize) -> Value {
    if depth >= MAX_RESOLVE_DEPTH {
        warn!(depth, "schema nesting exceeds resolve depth limit, truncating");
        return json!({});
    }

    let obj = match schema.as_object() {
        Some(obj) => obj,
        // Primitives and non-object fragments pass through unchanged.
        None => return schema.clone(),
    };

    if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
        return match lookup_pointer(document, reference) {
            Some(target) => resolve_at(target, document, depth + 1),
            None => {
                warn!(reference, "unresolvable $ref, substituting empty schema");
                json!({})
            }
        };
    }

    for keyword in ["allOf", "anyOf", "oneOf"] {
        if let Some(branches) = obj.get(keyword).and_then(Value::as_array) {
            return merge_branches(branches, document, depth);
        }
    }

    let mut resolved = Map::new();
    for (key, value) in obj {
        match key.as_str() {
            "properties" => {
                let mut properties = Map::new();
                if let Some(props) = value.as_object() {
                    for (name, prop) in props {
                        properties.insert(name.clone(), resolve_at(prop, document, depth + 1));
                    }
                }
                resolved.insert(key.clone(), Value::Object(properties));
            }
            "items" => {
                resolved.insert(key.clone(), resolve_at(value, document, depth + 1));
            }
            _ => {
                resolved.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(resolved)
}

/// Merge composition branches into one synthetic object schema
fn merge_branches(branches: &[Value], document: &Value, depth: usize) -> Value {
    let mut properties = Map::new();
    let mut required: Vec<String> = Vec::new();

    for branch in branches {
        let resolved = resolve_at(branch, document, depth + 1);
        if let Some(props) = resolved.get("properties").and_then(Value::as_object) {
            for (name, prop) in props {
                // Later branches overwrite earlier ones on collision.
                properties.insert(name.clone(), prop.clone());
            }
        }
        if let Some(reqs) = resolved.get("required").and_then(Value::as_array) {
            for req in reqs {
                if let Some(name) = req.as_str() {
                    if !required.iter().any(|r| r == name) {
                        required.push(name.to_string());
                    }
                }
            }
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Walk a `#/a/b/c` JSON pointer inside the document
fn lookup_pointer<'a>(document: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    let mut current = document;
    for segment in pointer.split('/').filter(|s| !s.is_empty()) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        current = current.get(segment.as_str())?;
    }
    Some(current)
}

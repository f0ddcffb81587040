//! Parameter extraction from user utterances
//!
//! Three parsing strategies, tried in order by the engine: a JSON object,
//! comma-separated `key=value` pairs, and (when exactly one field is still
//! missing) the whole utterance as that field's value. Seeding from the
//! initial request goes through the [`ParameterExtractor`] seam so a
//! stronger NLU component can replace the keyword heuristics without
//! touching the state machine.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use toolbridge_spec::{FieldSchema, InputSchema};

/// Pluggable extraction seam for seeding parameters from free text
pub trait ParameterExtractor: Send + Sync {
    /// Pull values for declared fields out of an utterance
    fn extract(&self, utterance: &str, schema: &InputSchema) -> BTreeMap<String, Value>;
}

/// Pattern extractor matching declared parameter names in free text
///
/// Recognizes `field=value`, `field: value`, `field is value`, and for a
/// field literally named `name`, the phrasing `named X` / `called X`.
pub struct KeywordParameterExtractor;

impl ParameterExtractor for KeywordParameterExtractor {
    fn extract(&self, utterance: &str, schema: &InputSchema) -> BTreeMap<String, Value> {
        let mut extracted = BTreeMap::new();

        for (field, field_schema) in &schema.properties {
            let pattern = format!(
                r#"(?i)\b{}\s*(?:=|:|\bis\b)\s*(?:"([^"]+)"|'([^']+)'|([^\s,]+))"#,
                regex::escape(field)
            );
            let Ok(regex) = Regex::new(&pattern) else {
                continue;
            };
            if let Some(captures) = regex.captures(utterance) {
                let raw = captures
                    .get(1)
                    .or_else(|| captures.get(2))
                    .or_else(|| captures.get(3))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                extracted.insert(field.clone(), coerce_value(raw, Some(field_schema)));
                continue;
            }

            if field == "name" {
                let named = Regex::new(r#"(?i)\b(?:named|called)\s+"?([A-Za-z0-9_-]+)"?"#)
                    .expect("valid named pattern");
                if let Some(captures) = named.captures(utterance) {
                    extracted.insert(
                        field.clone(),
                        coerce_value(&captures[1], Some(field_schema)),
                    );
                }
            }
        }

        extracted
    }
}

/// Parse an utterance as a JSON object, `None` when it is not one
pub fn parse_json_object(utterance: &str) -> Option<BTreeMap<String, Value>> {
    let parsed: Value = serde_json::from_str(utterance.trim()).ok()?;
    let object = parsed.as_object()?;
    Some(
        object
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}

/// Parse comma-separated `key=value` (or `key: value`) pairs
///
/// Only declared field names are kept. Free text is full of accidental
/// colons (`http://...`), so an undeclared key means the chunk was not a
/// pair at all.
pub fn parse_key_value_pairs(utterance: &str, schema: &InputSchema) -> BTreeMap<String, Value> {
    let mut pairs = BTreeMap::new();
    for part in utterance.split(',') {
        let Some((key, raw)) = part.split_once('=').or_else(|| part.split_once(':')) else {
            continue;
        };
        let key = key.trim();
        let raw = raw.trim();
        if raw.is_empty() || !schema.has_field(key) {
            continue;
        }
        pairs.insert(
            key.to_string(),
            coerce_value(raw, schema.properties.get(key)),
        );
    }
    pairs
}

/// Convert a raw text value into a JSON value guided by the field schema
///
/// Without a schema the value stays a string unless it parses cleanly as a
/// bool or number.
pub fn coerce_value(raw: &str, schema: Option<&FieldSchema>) -> Value {
    let raw = raw
        .trim()
        .trim_matches('"')
        .trim_matches('\'');

    let schema_type = schema.and_then(|s| s.schema_type.as_deref());
    match schema_type {
        Some("integer") => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        Some("number") => raw
            .parse::<f64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        Some("boolean") => match raw.to_lowercase().as_str() {
            "true" | "yes" => Value::Bool(true),
            "false" | "no" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        Some("array") => Value::Array(
            raw.split(&[',', ' '][..])
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        ),
        Some("object") => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        }
        _ => {
            if let Ok(b) = raw.parse::<bool>() {
                Value::Bool(b)
            } else if let Ok(i) = raw.parse::<i64>() {
                Value::from(i)
            } else if let Ok(f) = raw.parse::<f64>() {
                Value::from(f)
            } else {
                Value::String(raw.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> InputSchema {
        let mut properties = BTreeMap::new();
        properties.insert(
            "name".to_string(),
            FieldSchema {
                schema_type: Some("string".to_string()),
                ..Default::default()
            },
        );
        properties.insert(
            "id".to_string(),
            FieldSchema {
                schema_type: Some("integer".to_string()),
                ..Default::default()
            },
        );
        properties.insert(
            "photoUrls".to_string(),
            FieldSchema {
                schema_type: Some("array".to_string()),
                ..Default::default()
            },
        );
        InputSchema {
            properties,
            required: vec!["name".to_string()],
        }
    }

    #[test]
    fn test_extract_key_value_in_free_text() {
        let extractor = KeywordParameterExtractor;
        let extracted = extractor.extract("delete the pet with id=7 please", &schema());
        assert_eq!(extracted.get("id"), Some(&json!(7)));
    }

    #[test]
    fn test_extract_named_phrasing() {
        let extractor = KeywordParameterExtractor;
        let extracted = extractor.extract("create a pet named Leo", &schema());
        assert_eq!(extracted.get("name"), Some(&json!("Leo")));
    }

    #[test]
    fn test_extract_quoted_value() {
        let extractor = KeywordParameterExtractor;
        let extracted = extractor.extract(r#"set name = "Mr Whiskers""#, &schema());
        assert_eq!(extracted.get("name"), Some(&json!("Mr Whiskers")));
    }

    #[test]
    fn test_extract_nothing_from_unrelated_text() {
        let extractor = KeywordParameterExtractor;
        let extracted = extractor.extract("what is the weather", &schema());
        assert!(extracted.is_empty());
    }

    #[test]
    fn test_parse_json_object() {
        let parsed = parse_json_object(r#"{"name": "Leo", "id": 7}"#).unwrap();
        assert_eq!(parsed.get("name"), Some(&json!("Leo")));
        assert_eq!(parsed.get("id"), Some(&json!(7)));

        assert!(parse_json_object("not json").is_none());
        assert!(parse_json_object("[1, 2]").is_none());
    }

    #[test]
    fn test_parse_key_value_pairs_with_coercion() {
        let pairs = parse_key_value_pairs("name=Leo, id=7", &schema());
        assert_eq!(pairs.get("name"), Some(&json!("Leo")));
        assert_eq!(pairs.get("id"), Some(&json!(7)));
    }

    #[test]
    fn test_parse_key_value_pairs_drops_undeclared_keys() {
        let pairs = parse_key_value_pairs("color=red", &schema());
        assert!(pairs.is_empty());

        // A bare URL is not a `http: //...` pair.
        let pairs = parse_key_value_pairs("http://img.example.com/rex.jpg", &schema());
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_coerce_array_from_whitespace_list() {
        let field = FieldSchema {
            schema_type: Some("array".to_string()),
            ..Default::default()
        };
        assert_eq!(
            coerce_value("http://a.jpg http://b.jpg", Some(&field)),
            json!(["http://a.jpg", "http://b.jpg"])
        );
    }

    #[test]
    fn test_coerce_without_schema_infers_scalars() {
        assert_eq!(coerce_value("7", None), json!(7));
        assert_eq!(coerce_value("true", None), json!(true));
        assert_eq!(coerce_value("1.5", None), json!(1.5));
        assert_eq!(coerce_value("Leo", None), json!("Leo"));
    }
}

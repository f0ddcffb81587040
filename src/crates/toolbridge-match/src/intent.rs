//! Query intent classification
//!
//! Classifies a free-form query into a CRUD intent by matching a fixed verb
//! vocabulary. The classifier sits behind a trait so a stronger NLU
//! component can be substituted without touching the match engine or the
//! dialogue state machine.

use regex::Regex;
use serde::{Deserialize, Serialize};
use toolbridge_spec::HttpMethod;

/// CRUD intent of a natural-language query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Create,
    Read,
    Update,
    Delete,
    Other,
}

impl Intent {
    /// Whether the given HTTP method is canonical for this intent
    pub fn matches_method(&self, method: HttpMethod) -> bool {
        match self {
            Intent::Create => matches!(method, HttpMethod::Post | HttpMethod::Put),
            Intent::Read => matches!(method, HttpMethod::Get | HttpMethod::Head),
            Intent::Update => matches!(method, HttpMethod::Put | HttpMethod::Patch),
            Intent::Delete => matches!(method, HttpMethod::Delete),
            Intent::Other => false,
        }
    }
}

/// Pluggable intent classification seam
pub trait IntentClassifier: Send + Sync {
    /// Classify a query into an intent
    fn classify(&self, query: &str) -> Intent;
}

/// Regex classifier over a fixed verb vocabulary
///
/// Vocabularies are checked in a fixed order (create, read, update, delete)
/// so classification is deterministic when a query contains verbs from more
/// than one group.
pub struct RegexIntentClassifier {
    patterns: Vec<(Intent, Regex)>,
}

impl RegexIntentClassifier {
    /// Build the classifier with the default verb vocabulary
    pub fn new() -> Self {
        let vocabulary = [
            (
                Intent::Create,
                r"\b(create|add|new|make|register|insert|post|upload)\b",
            ),
            (
                Intent::Read,
                r"\b(get|list|show|find|fetch|read|retrieve|search|view|look up)\b",
            ),
            (
                Intent::Update,
                r"\b(update|change|modify|edit|rename|patch|replace)\b",
            ),
            (
                Intent::Delete,
                r"\b(delete|remove|erase|destroy|drop|unregister)\b",
            ),
        ];
        let patterns = vocabulary
            .into_iter()
            .map(|(intent, pattern)| {
                // Vocabulary patterns are fixed literals; a failure here is a
                // programming error, not runtime input.
                (intent, Regex::new(pattern).expect("valid intent pattern"))
            })
            .collect();
        Self { patterns }
    }
}

impl Default for RegexIntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier for RegexIntentClassifier {
    fn classify(&self, query: &str) -> Intent {
        let query = query.to_lowercase();
        for (intent, pattern) in &self.patterns {
            if pattern.is_match(&query) {
                return *intent;
            }
        }
        Intent::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_crud_verbs() {
        let classifier = RegexIntentClassifier::new();
        assert_eq!(classifier.classify("create a pet named Leo"), Intent::Create);
        assert_eq!(classifier.classify("show me all orders"), Intent::Read);
        assert_eq!(classifier.classify("update the user email"), Intent::Update);
        assert_eq!(classifier.classify("remove pet 7"), Intent::Delete);
        assert_eq!(classifier.classify("pet store stuff"), Intent::Other);
    }

    #[test]
    fn test_classification_order_is_deterministic() {
        let classifier = RegexIntentClassifier::new();
        // Both "add" and "list" appear; create is checked first.
        assert_eq!(classifier.classify("add it to the list"), Intent::Create);
    }

    #[test]
    fn test_word_boundaries_respected() {
        let classifier = RegexIntentClassifier::new();
        // "additional" must not match "add".
        assert_eq!(classifier.classify("additional details"), Intent::Other);
    }

    #[test]
    fn test_intent_method_mapping() {
        assert!(Intent::Create.matches_method(HttpMethod::Post));
        assert!(Intent::Create.matches_method(HttpMethod::Put));
        assert!(Intent::Read.matches_method(HttpMethod::Head));
        assert!(Intent::Update.matches_method(HttpMethod::Patch));
        assert!(Intent::Delete.matches_method(HttpMethod::Delete));
        assert!(!Intent::Delete.matches_method(HttpMethod::Get));
        assert!(!Intent::Other.matches_method(HttpMethod::Get));
    }
}

//! # toolbridge-match - Tool Matching Engine
//!
//! Matches free-form natural-language requests to the best compiled tool.
//! An in-memory [`ToolIndex`] (exact-name lookup plus an inverted keyword
//! index) is built once per tool set; the [`MatchEngine`] then fuses four
//! signals (semantic similarity, keyword overlap, CRUD intent, and path
//! overlap) into one confidence score per candidate and returns a ranked
//! list.
//!
//! The engine never fails a match outright: with no embedding backend the
//! semantic signal is held neutral, and a low-confidence best match is
//! still returned so the caller can decide how to proceed.

pub mod engine;
pub mod index;
pub mod intent;

pub use engine::{
    MatchEngine, ScoreBreakdown, ScoredTool, INTENT_WEIGHT, KEYWORD_WEIGHT, NEUTRAL_SEMANTIC,
    PATH_WEIGHT, SEMANTIC_WEIGHT,
};
pub use index::{tokenize, ToolIndex};
pub use intent::{Intent, IntentClassifier, RegexIntentClassifier};

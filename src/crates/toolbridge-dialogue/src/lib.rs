//! Slot-filling dialogue engine for toolbridge
//!
//! Turns a compiled tool set into a conversational surface: each user turn
//! is matched against the tools, parameters are collected one clarification
//! at a time, and a fully specified call is synthesized and executed.

pub mod conversation;
pub mod engine;
pub mod error;
pub mod extract;

pub use conversation::{
    Conversation, ConversationMessage, ConversationStore, ConversationSummary, DialoguePhase,
    InMemoryConversationStore, MessageRole,
};
pub use engine::{
    ClarificationRequest, ClarificationType, MissingField, SlotFillingEngine, TurnResponse,
    TurnState,
};
pub use error::{DialogueError, Result};
pub use extract::{KeywordParameterExtractor, ParameterExtractor};

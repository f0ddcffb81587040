//! API request handlers
//!
//! Provides handler functions for all API endpoints organized by resource.

pub mod chat;
pub mod conversations;
pub mod health;
pub mod tools;

pub use chat::chat;
pub use conversations::{delete_conversation, get_conversation, list_conversations};
pub use health::health;
pub use tools::{get_tool, list_tools};

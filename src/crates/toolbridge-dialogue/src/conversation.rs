//! Conversation model and persistence contract
//!
//! A [`Conversation`] couples the append-only message transcript with the
//! slot-filling state the engine mutates on every turn. The required-field
//! view is always derived from the current tool and collected parameters,
//! never stored, so it cannot go stale.
//!
//! Persistence sits behind the [`ConversationStore`] trait; the bundled
//! [`InMemoryConversationStore`] is the reference backend for development
//! and tests, with an idle-eviction helper for the conversation lifetime
//! policy.

use crate::error::{DialogueError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use toolbridge_spec::ToolDescriptor;
use uuid::Uuid;

/// Author of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// One append-only transcript entry; never mutated after append
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Unique message id
    pub id: Uuid,
    /// Who authored the message
    pub role: MessageRole,
    /// Message text
    pub content: String,
    /// When the message was appended
    pub timestamp: DateTime<Utc>,
    /// Optional structured payload (execution results, score breakdowns)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ConversationMessage {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Attach structured metadata
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Where a conversation stands in the slot-filling flow
///
/// `Executed` and `Cancelled` are reported per turn but never stored: a
/// successful execution resets the conversation to `NoTool` for the next
/// request, and a cancellation does the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialoguePhase {
    /// No tool selected yet
    NoTool,
    /// A tool was matched this turn
    ToolMatched,
    /// Required parameters are still being collected
    CollectingParameters,
    /// All required parameters present; executable
    Ready,
}

/// One active conversation: transcript plus slot-filling state
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Conversation id, chosen by the caller
    pub id: String,
    /// Current slot-filling phase
    pub phase: DialoguePhase,
    /// Tool being filled, once matched
    pub current_tool: Option<Arc<ToolDescriptor>>,
    /// Parameter values collected so far; keys always come from the
    /// current tool's declared properties
    pub collected_parameters: BTreeMap<String, Value>,
    /// Whether the one-shot optional-field suggestion was already emitted
    pub suggested_optional: bool,
    /// Last turn or append, drives idle eviction
    pub last_activity: DateTime<Utc>,
    /// Append-only transcript
    pub messages: Vec<ConversationMessage>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            phase: DialoguePhase::NoTool,
            current_tool: None,
            collected_parameters: BTreeMap::new(),
            suggested_optional: false,
            last_activity: Utc::now(),
            messages: Vec::new(),
        }
    }

    /// Append a message and refresh the activity timestamp
    pub fn push(&mut self, message: ConversationMessage) {
        self.messages.push(message);
        self.last_activity = Utc::now();
    }

    /// Required fields not yet collected, in declaration order
    ///
    /// Recomputed on every call; a derived view, never cached.
    pub fn missing_required(&self) -> Vec<String> {
        match &self.current_tool {
            Some(tool) => tool
                .input_schema
                .required
                .iter()
                .filter(|name| !self.collected_parameters.contains_key(*name))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Optional fields not yet collected
    pub fn unfilled_optional(&self) -> Vec<String> {
        match &self.current_tool {
            Some(tool) => tool
                .input_schema
                .optional_fields()
                .into_iter()
                .filter(|name| !self.collected_parameters.contains_key(*name))
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Discard the tool and all collected parameters; transcript survives
    pub fn reset(&mut self) {
        self.phase = DialoguePhase::NoTool;
        self.current_tool = None;
        self.collected_parameters.clear();
        self.suggested_optional = false;
    }
}

/// Listing entry for a stored conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub last_activity: DateTime<Utc>,
    pub message_count: usize,
}

/// Saves and loads conversations by id
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist the conversation under its id
    async fn save(&self, conversation: &Conversation) -> Result<()>;

    /// Load a conversation, `None` when unknown
    async fn load(&self, id: &str) -> Result<Option<Conversation>>;

    /// Summaries of all stored conversations
    async fn list(&self) -> Result<Vec<ConversationSummary>>;

    /// Remove a conversation; unknown ids are a no-op
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Thread-safe in-memory conversation store
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl InMemoryConversationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove conversations idle for longer than `max_idle`
    ///
    /// Returns the number evicted.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut conversations = self.conversations.write().await;
        let before = conversations.len();
        conversations.retain(|_, conversation| conversation.last_activity >= cutoff);
        before - conversations.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn save(&self, conversation: &Conversation) -> Result<()> {
        self.conversations
            .write()
            .await
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.conversations.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<ConversationSummary>> {
        let conversations = self.conversations.read().await;
        let mut summaries: Vec<ConversationSummary> = conversations
            .values()
            .map(|c| ConversationSummary {
                id: c.id.clone(),
                last_activity: c.last_activity,
                message_count: c.messages.len(),
            })
            .collect();
        summaries.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(summaries)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.conversations.write().await.remove(id);
        Ok(())
    }
}

// Allows store backends to surface their own failures uniformly.
impl From<String> for DialogueError {
    fn from(message: String) -> Self {
        DialogueError::Store(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let store = InMemoryConversationStore::new();
        let mut conversation = Conversation::new("c1");
        conversation.push(ConversationMessage::user("hello"));
        store.save(&conversation).await.unwrap();

        let loaded = store.load("c1").await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].role, MessageRole::User);

        assert!(store.load("c2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_counts_and_orders() {
        let store = InMemoryConversationStore::new();
        let mut a = Conversation::new("a");
        a.push(ConversationMessage::user("1"));
        store.save(&a).await.unwrap();
        let mut b = Conversation::new("b");
        b.push(ConversationMessage::user("1"));
        b.push(ConversationMessage::assistant("2"));
        store.save(&b).await.unwrap();

        let summaries = store.list().await.unwrap();
        assert_eq!(summaries.len(), 2);
        // Most recently active first.
        assert_eq!(summaries[0].id, "b");
        assert_eq!(summaries[0].message_count, 2);
    }

    #[tokio::test]
    async fn test_evict_idle_removes_only_stale() {
        let store = InMemoryConversationStore::new();
        let mut stale = Conversation::new("stale");
        stale.last_activity = Utc::now() - Duration::hours(2);
        store.save(&stale).await.unwrap();
        store.save(&Conversation::new("fresh")).await.unwrap();

        let evicted = store.evict_idle(Duration::hours(1)).await;

        assert_eq!(evicted, 1);
        assert!(store.load("stale").await.unwrap().is_none());
        assert!(store.load("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_unknown_is_noop() {
        let store = InMemoryConversationStore::new();
        store.delete("ghost").await.unwrap();
    }

    #[test]
    fn test_reset_preserves_transcript() {
        let mut conversation = Conversation::new("c1");
        conversation.push(ConversationMessage::user("hi"));
        conversation
            .collected_parameters
            .insert("name".to_string(), json!("Leo"));
        conversation.phase = DialoguePhase::Ready;

        conversation.reset();

        assert_eq!(conversation.phase, DialoguePhase::NoTool);
        assert!(conversation.collected_parameters.is_empty());
        assert_eq!(conversation.messages.len(), 1);
    }
}

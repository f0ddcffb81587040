//! API request and response models
//!
//! JSON shapes exposed by the REST surface. Tool and conversation types are
//! projected into flat response structs here rather than serialized
//! directly, so internal representation changes never leak into the wire
//! format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use toolbridge_dialogue::{Conversation, ConversationMessage};
use toolbridge_spec::ToolDescriptor;

/// Basic health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Number of tools currently loaded
    pub tool_count: usize,
}

/// One entry in the tool listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSummary {
    /// Tool name
    pub name: String,
    /// HTTP method of the underlying operation
    pub method: String,
    /// Path template of the underlying operation
    pub path: String,
    /// Operation summary
    pub description: String,
}

impl ToolSummary {
    /// Project a compiled tool into its listing entry
    pub fn from_tool(tool: &ToolDescriptor) -> Self {
        Self {
            name: tool.name.clone(),
            method: tool.endpoint.method.to_string(),
            path: tool.endpoint.path.clone(),
            description: tool.description.clone(),
        }
    }
}

/// Chat turn request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation to continue; a fresh id is generated when absent
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// User utterance
    pub message: String,
}

/// Full conversation detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDetail {
    /// Conversation id
    pub id: String,
    /// Current slot-filling phase
    pub phase: String,
    /// Name of the tool being filled, when any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Parameter values collected so far
    pub collected_parameters: BTreeMap<String, Value>,
    /// Required fields still missing
    pub missing_required: Vec<String>,
    /// Last activity timestamp
    pub last_activity: DateTime<Utc>,
    /// Full transcript
    pub messages: Vec<ConversationMessage>,
}

impl ConversationDetail {
    /// Project a stored conversation into its response shape
    pub fn from_conversation(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            phase: format!("{:?}", conversation.phase),
            tool: conversation.current_tool.as_ref().map(|t| t.name.clone()),
            collected_parameters: conversation.collected_parameters.clone(),
            missing_required: conversation.missing_required(),
            last_activity: conversation.last_activity,
            messages: conversation.messages.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolbridge_dialogue::DialoguePhase;

    #[test]
    fn test_chat_request_without_conversation_id() {
        let request: ChatRequest = serde_json::from_str(r#"{"message": "add a pet"}"#).unwrap();
        assert!(request.conversation_id.is_none());
        assert_eq!(request.message, "add a pet");
    }

    #[test]
    fn test_conversation_detail_projection() {
        let mut conversation = Conversation::new("c1");
        conversation.phase = DialoguePhase::CollectingParameters;
        conversation.push(ConversationMessage::user("hello"));

        let detail = ConversationDetail::from_conversation(&conversation);
        assert_eq!(detail.id, "c1");
        assert_eq!(detail.phase, "CollectingParameters");
        assert!(detail.tool.is_none());
        assert_eq!(detail.messages.len(), 1);
    }
}

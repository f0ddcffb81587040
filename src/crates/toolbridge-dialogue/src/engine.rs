//! Slot-filling dialogue engine
//!
//! A per-conversation state machine that walks
//! `NoTool → ToolMatched → CollectingParameters → Ready → Executed`, with a
//! `Cancelled` exit reachable from any non-terminal state. Each user turn
//! either selects a tool, contributes parameter values, or triggers
//! execution; the engine answers every turn with an assistant reply and,
//! while parameters are missing, a structured clarification naming exactly
//! one field at a time.
//!
//! Turns for one conversation are strictly sequential: a per-conversation
//! async lock is held for the whole turn, so two concurrent messages for
//! the same conversation cannot race on the collected parameters.
//! Cancellation is cooperative: a cancel utterance is just another turn.

use crate::conversation::{
    Conversation, ConversationMessage, ConversationStore, DialoguePhase,
};
use crate::error::Result;
use crate::extract::{
    coerce_value, parse_json_object, parse_key_value_pairs, KeywordParameterExtractor,
    ParameterExtractor,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use toolbridge_exec::{ExecutionResult, Transport};
use toolbridge_match::MatchEngine;
use toolbridge_spec::ToolDescriptor;
use tracing::{debug, info};

/// Utterances that cancel the current tool unconditionally
const CANCEL_WORDS: &[&str] = &["cancel", "abort", "stop", "nevermind", "never mind"];

/// Utterances that confirm execution from the `Ready` state
const CONFIRM_WORDS: &[&str] = &["execute", "run", "go", "yes", "confirm", "do it"];

/// Kind of clarification the engine is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarificationType {
    MissingRequired,
    SuggestOptional,
    Confirmation,
}

/// One field the user is being asked about
#[derive(Debug, Clone, Serialize)]
pub struct MissingField {
    /// Field name as declared in the tool schema
    pub name: String,
    /// Field description, when the specification provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the field is required
    pub required: bool,
    /// Allowed values, when the field declares an enum
    #[serde(skip_serializing_if = "Option::is_none")]
    pub possible_values: Option<Vec<String>>,
    /// Example values from the specification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
}

/// Structured prompt asking the user for specific values
#[derive(Debug, Clone, Serialize)]
pub struct ClarificationRequest {
    /// What kind of answer is expected
    #[serde(rename = "type")]
    pub kind: ClarificationType,
    /// Human-readable prompt
    pub message: String,
    /// Fields being asked about
    pub fields: Vec<MissingField>,
}

/// State reported for a completed turn
///
/// `Executed` and `Cancelled` are turn outcomes; the stored conversation is
/// already reset to `NoTool` when they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    NoTool,
    ToolMatched,
    CollectingParameters,
    Ready,
    Executed,
    Cancelled,
}

impl From<DialoguePhase> for TurnState {
    fn from(phase: DialoguePhase) -> Self {
        match phase {
            DialoguePhase::NoTool => TurnState::NoTool,
            DialoguePhase::ToolMatched => TurnState::ToolMatched,
            DialoguePhase::CollectingParameters => TurnState::CollectingParameters,
            DialoguePhase::Ready => TurnState::Ready,
        }
    }
}

/// Everything a caller needs to render one turn's outcome
#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    /// Conversation the turn belongs to
    pub conversation_id: String,
    /// Assistant reply text
    pub reply: String,
    /// State after the turn
    pub state: TurnState,
    /// Name of the currently selected tool, when any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Match confidence, set on the turn a tool was selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f32>,
    /// Pending clarification, when the engine is asking for values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarification: Option<ClarificationRequest>,
    /// Execution outcome, set on turns that ran the call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionResult>,
}

/// Drives slot-filling conversations over a shared match engine
///
/// One engine instance serves many conversations; all per-conversation
/// state lives in the store, keyed by conversation id.
pub struct SlotFillingEngine {
    matcher: Arc<MatchEngine>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn ConversationStore>,
    extractor: Box<dyn ParameterExtractor>,
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SlotFillingEngine {
    /// Create an engine with the default keyword parameter extractor
    pub fn new(
        matcher: Arc<MatchEngine>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            matcher,
            transport,
            store,
            extractor: Box::new(KeywordParameterExtractor),
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Substitute a different parameter extractor
    pub fn with_extractor(mut self, extractor: Box<dyn ParameterExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// The conversation store this engine persists into
    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Process one user turn for a conversation
    ///
    /// Turns for the same conversation are serialized: the per-conversation
    /// lock is held until the transition has completed and state has been
    /// persisted.
    pub async fn handle_turn(&self, conversation_id: &str, utterance: &str) -> Result<TurnResponse> {
        let lock = self.turn_lock(conversation_id).await;
        let guard = lock.lock().await;

        let result = self.run_turn(conversation_id, utterance).await;

        drop(guard);
        self.release_turn_lock(conversation_id, lock).await;
        result
    }

    async fn run_turn(&self, conversation_id: &str, utterance: &str) -> Result<TurnResponse> {
        let mut conversation = self
            .store
            .load(conversation_id)
            .await?
            .unwrap_or_else(|| Conversation::new(conversation_id));
        conversation.push(ConversationMessage::user(utterance));

        let response = self.advance(&mut conversation, utterance).await;

        let mut reply = ConversationMessage::assistant(&response.reply);
        if let Some(execution) = &response.execution {
            reply = reply.with_metadata(serde_json::to_value(execution)?);
        }
        conversation.push(reply);
        self.store.save(&conversation).await?;

        Ok(response)
    }

    async fn turn_lock(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.turn_locks.lock().await;
        locks
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the map entry once no other turn holds a clone
    ///
    /// Without this the lock map grows by one entry per conversation id
    /// ever seen. While the map mutex is held no new clone can be handed
    /// out, so a strong count of two (the map entry plus ours) means no
    /// concurrent turn is waiting.
    async fn release_turn_lock(&self, conversation_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.turn_locks.lock().await;
        let current = match locks.get(conversation_id) {
            Some(entry) => entry,
            None => return,
        };
        // Only remove the entry we were handed; a pruned-and-reinserted
        // entry for the same id belongs to another turn.
        if Arc::ptr_eq(current, &lock) && Arc::strong_count(&lock) <= 2 {
            locks.remove(conversation_id);
        }
    }

    async fn advance(&self, conversation: &mut Conversation, utterance: &str) -> TurnResponse {
        if conversation.phase != DialoguePhase::NoTool && is_cancellation(utterance) {
            let tool = conversation
                .current_tool
                .as_ref()
                .map(|t| t.name.clone())
                .unwrap_or_default();
            conversation.reset();
            info!(conversation = %conversation.id, tool, "conversation cancelled");
            return TurnResponse {
                conversation_id: conversation.id.clone(),
                reply: "Cancelled. What would you like to do next?".to_string(),
                state: TurnState::Cancelled,
                tool: None,
                match_score: None,
                clarification: None,
                execution: None,
            };
        }

        match conversation.phase {
            DialoguePhase::NoTool => self.select_tool(conversation, utterance).await,
            DialoguePhase::ToolMatched | DialoguePhase::CollectingParameters => {
                self.collect(conversation, utterance).await
            }
            DialoguePhase::Ready => self.ready_turn(conversation, utterance).await,
        }
    }

    /// NoTool: match the utterance against the tool set and seed parameters
    async fn select_tool(&self, conversation: &mut Conversation, utterance: &str) -> TurnResponse {
        let scored = match self.matcher.find_best_match(utterance).await {
            Some(scored) => scored,
            None => {
                return TurnResponse {
                    conversation_id: conversation.id.clone(),
                    reply: "No tool found for that request. Try describing the API operation \
                            you want to call."
                        .to_string(),
                    state: TurnState::NoTool,
                    tool: None,
                    match_score: None,
                    clarification: None,
                    execution: None,
                };
            }
        };

        let tool = Arc::clone(&scored.tool);
        debug!(
            conversation = %conversation.id,
            tool = %tool.name,
            score = scored.score,
            "tool matched"
        );
        conversation.current_tool = Some(Arc::clone(&tool));
        conversation.phase = DialoguePhase::ToolMatched;

        // Heuristic seeds are merged best-effort; values failing enum
        // validation are dropped silently rather than surfaced.
        let seeded = self.extractor.extract(utterance, &tool.input_schema);
        for (field, value) in seeded {
            if validate_field(&tool, &field, &value).is_ok() {
                merge_parameter(conversation, &tool, &field, value);
            }
        }

        let mut response = self
            .after_merge(conversation, &tool, DialoguePhase::ToolMatched)
            .await;
        response.match_score = Some(scored.score);
        response
    }

    /// ToolMatched/CollectingParameters: parse the utterance for values
    async fn collect(&self, conversation: &mut Conversation, utterance: &str) -> TurnResponse {
        let tool = match conversation.current_tool.clone() {
            Some(tool) => tool,
            None => {
                // Inconsistent state; recover by starting over.
                conversation.reset();
                return Box::pin(self.select_tool(conversation, utterance)).await;
            }
        };

        let mut parsed = parse_json_object(utterance)
            .unwrap_or_else(|| parse_key_value_pairs(utterance, &tool.input_schema));
        if parsed.is_empty() && !is_confirmation(utterance) {
            // With exactly one field still missing, the whole utterance is
            // that field's value. Confirmation words are never values; a
            // premature "execute" just re-prompts for what is missing.
            let missing = conversation.missing_required();
            if missing.len() == 1 {
                let field = &missing[0];
                parsed.insert(
                    field.clone(),
                    coerce_value(utterance, tool.input_schema.properties.get(field)),
                );
            }
        }

        if let Some(response) = self.merge_validated(conversation, &tool, parsed) {
            return response;
        }
        self.after_merge(conversation, &tool, DialoguePhase::CollectingParameters)
            .await
    }

    /// Ready: accept optional values or a confirmation, then execute
    ///
    /// Free text that is neither a confirmation nor parseable values never
    /// fires the call; the engine re-prompts instead.
    async fn ready_turn(&self, conversation: &mut Conversation, utterance: &str) -> TurnResponse {
        let tool = match conversation.current_tool.clone() {
            Some(tool) => tool,
            None => {
                conversation.reset();
                return Box::pin(self.select_tool(conversation, utterance)).await;
            }
        };

        if !is_confirmation(utterance) {
            let parsed = parse_json_object(utterance)
                .unwrap_or_else(|| parse_key_value_pairs(utterance, &tool.input_schema));
            if parsed.is_empty() {
                return self.confirm_prompt(conversation, &tool);
            }
            if let Some(response) = self.merge_validated(conversation, &tool, parsed) {
                return response;
            }
        }
        self.execute_ready(conversation, &tool).await
    }

    /// Re-emit the ready summary without executing
    fn confirm_prompt(
        &self,
        conversation: &Conversation,
        tool: &Arc<ToolDescriptor>,
    ) -> TurnResponse {
        let message = format!(
            "{} is ready to run against {} {}. Say \"execute\" to run the call \
             now, or \"cancel\" to abort.",
            tool.name, tool.endpoint.method, tool.endpoint.path
        );
        TurnResponse {
            conversation_id: conversation.id.clone(),
            reply: message.clone(),
            state: TurnState::Ready,
            tool: Some(tool.name.clone()),
            match_score: None,
            clarification: Some(ClarificationRequest {
                kind: ClarificationType::Confirmation,
                message,
                fields: Vec::new(),
            }),
            execution: None,
        }
    }

    /// Merge parsed values after validation; `Some` is a rejection response
    fn merge_validated(
        &self,
        conversation: &mut Conversation,
        tool: &Arc<ToolDescriptor>,
        parsed: BTreeMap<String, Value>,
    ) -> Option<TurnResponse> {
        for (field, value) in parsed {
            match validate_field(tool, &field, &value) {
                Ok(()) => merge_parameter(conversation, tool, &field, value),
                Err(error) => {
                    // Field stays missing; state does not advance.
                    let clarification = if tool.input_schema.is_required(&field) {
                        clarify_missing(tool, &field)
                    } else {
                        None
                    };
                    return Some(TurnResponse {
                        conversation_id: conversation.id.clone(),
                        reply: error,
                        state: conversation.phase.into(),
                        tool: Some(tool.name.clone()),
                        match_score: None,
                        clarification,
                        execution: None,
                    });
                }
            }
        }
        None
    }

    /// Decide what comes after a merge: ask for the next required field,
    /// suggest optional fields once, or execute
    async fn after_merge(
        &self,
        conversation: &mut Conversation,
        tool: &Arc<ToolDescriptor>,
        phase_if_missing: DialoguePhase,
    ) -> TurnResponse {
        let missing = conversation.missing_required();
        if let Some(next) = missing.first() {
            conversation.phase = phase_if_missing;
            let clarification = clarify_missing(tool, next);
            let reply = clarification
                .as_ref()
                .map(|c| c.message.clone())
                .unwrap_or_else(|| format!("I need a value for `{next}`."));
            return TurnResponse {
                conversation_id: conversation.id.clone(),
                reply,
                state: conversation.phase.into(),
                tool: Some(tool.name.clone()),
                match_score: None,
                clarification,
                execution: None,
            };
        }

        conversation.phase = DialoguePhase::Ready;
        let optional = conversation.unfilled_optional();
        if !optional.is_empty() && !conversation.suggested_optional {
            conversation.suggested_optional = true;
            let fields: Vec<MissingField> = optional
                .iter()
                .map(|name| missing_field_for(tool, name))
                .collect();
            let names = optional.join(", ");
            let message = format!(
                "All required values for {} are set. Optional fields you could still \
                 provide: {}. Reply with values, or say \"execute\" to run the call now.",
                tool.name, names
            );
            return TurnResponse {
                conversation_id: conversation.id.clone(),
                reply: message.clone(),
                state: TurnState::Ready,
                tool: Some(tool.name.clone()),
                match_score: None,
                clarification: Some(ClarificationRequest {
                    kind: ClarificationType::SuggestOptional,
                    message,
                    fields,
                }),
                execution: None,
            };
        }

        self.execute_ready(conversation, tool).await
    }

    /// Ready → Executed: synthesize and send; failure keeps the state Ready
    async fn execute_ready(
        &self,
        conversation: &mut Conversation,
        tool: &Arc<ToolDescriptor>,
    ) -> TurnResponse {
        let result = toolbridge_exec::execute(
            self.transport.as_ref(),
            tool,
            &conversation.collected_parameters,
        )
        .await;

        if result.success {
            info!(
                conversation = %conversation.id,
                tool = %tool.name,
                status = ?result.status_code,
                "command executed"
            );
            let body = result
                .body
                .as_ref()
                .map(|b| b.to_string())
                .unwrap_or_else(|| "(empty body)".to_string());
            let reply = format!(
                "Executed {} (HTTP {}): {}",
                tool.name,
                result.status_code.unwrap_or_default(),
                body
            );
            conversation.reset();
            TurnResponse {
                conversation_id: conversation.id.clone(),
                reply,
                state: TurnState::Executed,
                tool: Some(tool.name.clone()),
                match_score: None,
                clarification: None,
                execution: Some(result),
            }
        } else {
            // Collected parameters survive so the user can retry.
            conversation.phase = DialoguePhase::Ready;
            let reply = format!(
                "Execution of {} failed: {}. Say \"execute\" to retry or \"cancel\" to abort.",
                tool.name,
                result.error.as_deref().unwrap_or("unknown error")
            );
            TurnResponse {
                conversation_id: conversation.id.clone(),
                reply,
                state: TurnState::Ready,
                tool: Some(tool.name.clone()),
                match_score: None,
                clarification: None,
                execution: Some(result),
            }
        }
    }
}

/// Whether the utterance cancels the current tool
fn is_cancellation(utterance: &str) -> bool {
    CANCEL_WORDS.contains(&utterance.trim().to_lowercase().as_str())
}

/// Whether the utterance confirms execution
fn is_confirmation(utterance: &str) -> bool {
    CONFIRM_WORDS.contains(&utterance.trim().to_lowercase().as_str())
}

/// Check a submitted value against the field's declared enum
///
/// Matching is case-insensitive exact; unknown fields are rejected so the
/// collected keys always stay within the declared properties.
fn validate_field(tool: &ToolDescriptor, field: &str, value: &Value) -> std::result::Result<(), String> {
    let schema = match tool.input_schema.properties.get(field) {
        Some(schema) => schema,
        None => {
            return Err(format!(
                "`{}` is not a parameter of {}.",
                field, tool.name
            ))
        }
    };
    let Some(allowed) = schema.enum_strings() else {
        return Ok(());
    };
    let submitted = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if allowed
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(&submitted))
    {
        Ok(())
    } else {
        Err(format!(
            "`{}` must be one of: {}. Got `{}`.",
            field,
            allowed.join(", "),
            submitted
        ))
    }
}

/// Insert a validated value, canonicalizing enum casing; last value wins
fn merge_parameter(
    conversation: &mut Conversation,
    tool: &ToolDescriptor,
    field: &str,
    value: Value,
) {
    let value = canonicalize_enum(tool, field, value);
    conversation
        .collected_parameters
        .insert(field.to_string(), value);
}

/// Replace a case-insensitive enum hit with the declared casing
fn canonicalize_enum(tool: &ToolDescriptor, field: &str, value: Value) -> Value {
    let Some(schema) = tool.input_schema.properties.get(field) else {
        return value;
    };
    let Some(allowed) = schema.enum_strings() else {
        return value;
    };
    if let Value::String(submitted) = &value {
        if let Some(canonical) = allowed.iter().find(|c| c.eq_ignore_ascii_case(submitted)) {
            return Value::String(canonical.clone());
        }
    }
    value
}

/// Build the one-field clarification for the next missing required value
fn clarify_missing(tool: &ToolDescriptor, field: &str) -> Option<ClarificationRequest> {
    let missing = missing_field_for(tool, field);
    let mut message = format!(
        "To call {}, I need a value for `{}`",
        tool.name, missing.name
    );
    if let Some(description) = &missing.description {
        message.push_str(&format!(" ({description})"));
    }
    if let Some(values) = &missing.possible_values {
        message.push_str(&format!(". Allowed values: {}", values.join(", ")));
    }
    message.push('.');
    Some(ClarificationRequest {
        kind: ClarificationType::MissingRequired,
        message,
        fields: vec![missing],
    })
}

fn missing_field_for(tool: &ToolDescriptor, field: &str) -> MissingField {
    let schema = tool.input_schema.properties.get(field);
    MissingField {
        name: field.to_string(),
        description: schema.and_then(|s| s.description.clone()),
        required: tool.input_schema.is_required(field),
        possible_values: schema.and_then(|s| s.enum_strings()),
        examples: schema.and_then(|s| {
            s.example.as_ref().map(|example| {
                vec![match example {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                }]
            })
        }),
    }
}

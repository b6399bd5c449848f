use serde_json::{Map, Value};

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// One piece of a message's content.
///
/// A tool-call part is only ever valid on a `Role::Model` message; a
/// tool-result part only on a `Role::User` message. The splitter and the
/// summarizer's transcript renderer both lean on that invariant rather than
/// re-deriving it.
#[derive(Debug, Clone)]
pub enum Part {
    Text(String),
    ToolCall {
        name: String,
        args: Map<String, Value>,
    },
    ToolResult {
        name: String,
        result: Value,
    },
    InlineBlob {
        mime_type: String,
        data: Vec<u8>,
    },
}

impl Part {
    /// Heuristic char-weight of this part's payload, before the chars/4
    /// division in the estimator.
    pub(crate) fn char_weight(&self) -> usize {
        match self {
            Part::Text(text) => text.len(),
            Part::ToolCall { name, args } => {
                let mut total = name.len();
                for (key, value) in args {
                    total += key.len() + value_string_form(value).len();
                }
                total
            }
            Part::ToolResult { name, result } => name.len() + value_string_form(result).len(),
            Part::InlineBlob { mime_type, data } => mime_type.len() + data.len(),
        }
    }
}

/// `string-form(value)` as spec.md calls it: the JSON serialization of the
/// value, used purely as a token-estimation surrogate.
pub(crate) fn value_string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self::text(Role::Model, text)
    }

    /// True if this message carries at least one tool-call part. Only
    /// meaningful on a `Role::Model` message per the data-model invariant.
    pub fn has_tool_call(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::ToolCall { .. }))
    }

    /// True if this message carries at least one tool-result part. Only
    /// meaningful on a `Role::User` message per the data-model invariant.
    pub fn has_tool_result(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, Part::ToolResult { .. }))
    }

    /// The first text part's contents, if any. Used to surface "the latest
    /// user text" for the continuation message.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            Part::Text(t) => Some(t.as_str()),
            _ => None,
        })
    }
}

/// A tool declaration as delivered to the model — name, description, and
/// parameter schema. Counted once per request by the estimator; forgetting
/// these was an observed production defect.
#[derive(Debug, Clone)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The object delivered to a `CompactionStrategy` on every call.
///
/// `max_output_tokens` is `0` for an ordinary agent turn (the caller's own
/// adapter config decides); the summarizer sets it explicitly to the
/// output cap derived from the compaction buffer (spec.md §4.4) when it
/// builds its own request.
#[derive(Debug, Clone, Default)]
pub struct ConversationRequest {
    pub messages: Vec<Message>,
    pub system_instruction: Option<String>,
    pub tools: Vec<ToolDeclaration>,
    pub max_output_tokens: u32,
}

/// Status of one todo-list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

/// A single todo-list entry, read-only to this component. Appended to the
/// summarization prompt so the resuming assistant can restore it.
#[derive(Debug, Clone)]
pub struct TodoItem {
    pub content: String,
    pub status: TodoStatus,
    pub active_form: Option<String>,
}

/// A single fragment of an LLM response, per the adapter contract.
///
/// Streaming partials (`partial == true`) carry no authoritative usage —
/// only the final, non-partial fragment's `usage` is trustworthy.
#[derive(Debug, Clone, Default)]
pub struct ResponseFragment {
    pub text: Option<String>,
    pub partial: bool,
    pub usage: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UsageMetadata {
    pub prompt_tokens: u32,
}

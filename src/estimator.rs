//! C1 — Token Estimator.
//!
//! A per-part sum of `chars / 4`, the same deliberately rough heuristic the
//! teacher's `ManagedContextManager` uses (`estimate_tokens`/
//! `estimate_str_tokens`). The divisor under-counts on purpose; the
//! calibrator corrects it against real provider counts.
//!
//! Every surface listed in spec.md §4.1 must be counted here — text,
//! tool-call, tool-result, inline-blob, and tool declarations — omitting
//! any one of them was an observed production defect.

use crate::types::{ConversationRequest, Message};

/// chars-per-token divisor. A deliberate under-estimate; see the calibrator.
const CHARS_PER_TOKEN: usize = 4;

/// Heuristic token count for a whole request: messages, system instruction,
/// and tool declarations (counted once per request, not per message).
pub fn estimate_request(request: &ConversationRequest) -> u32 {
    let mut chars = 0usize;

    for message in &request.messages {
        chars += message_char_weight(message);
    }

    if let Some(system) = &request.system_instruction {
        chars += system.len();
    }

    for tool in &request.tools {
        chars += tool.name.len() + tool.description.len() + tool.parameters.to_string().len();
    }

    (chars / CHARS_PER_TOKEN) as u32
}

/// Heuristic token count for a single message (sum over its parts).
pub fn estimate_message(message: &Message) -> u32 {
    (message_char_weight(message) / CHARS_PER_TOKEN) as u32
}

/// Heuristic token count for a plain string.
pub fn estimate_str(s: &str) -> u32 {
    (s.len() / CHARS_PER_TOKEN) as u32
}

/// Heuristic token count for a slice of messages, ignoring system
/// instruction and tool declarations — used by the splitter/summarizer when
/// working on a sub-sequence rather than a full request.
pub fn estimate_messages(messages: &[Message]) -> u32 {
    let chars: usize = messages.iter().map(message_char_weight).sum();
    (chars / CHARS_PER_TOKEN) as u32
}

fn message_char_weight(message: &Message) -> usize {
    message.parts.iter().map(|p| p.char_weight()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Part, Role, ToolDeclaration};
    use serde_json::json;

    fn base_request() -> ConversationRequest {
        ConversationRequest {
            messages: vec![Message::user_text("hello world")],
            system_instruction: None,
            tools: vec![],
            max_output_tokens: 0,
        }
    }

    #[test]
    fn chars_div_4() {
        assert_eq!(estimate_str("hello world"), 2); // 11 / 4
        assert_eq!(estimate_str(""), 0);
        assert_eq!(estimate_str(&"a".repeat(400)), 100);
    }

    #[test]
    fn counts_every_accounted_surface() {
        // Invariant 1 from spec.md §8: removing any one surface strictly
        // decreases the heuristic.
        let full = ConversationRequest {
            messages: vec![
                Message::user_text("some user text here"),
                Message {
                    role: Role::Model,
                    parts: vec![Part::ToolCall {
                        name: "read_file".into(),
                        args: json!({"path": "/a/b.rs"}).as_object().unwrap().clone(),
                    }],
                },
                Message {
                    role: Role::User,
                    parts: vec![Part::ToolResult {
                        name: "read_file".into(),
                        result: json!("fn main() {}"),
                    }],
                },
                Message {
                    role: Role::Model,
                    parts: vec![Part::InlineBlob {
                        mime_type: "image/png".into(),
                        data: vec![0u8; 256],
                    }],
                },
            ],
            system_instruction: Some("You are a helpful assistant.".into()),
            tools: vec![ToolDeclaration {
                name: "read_file".into(),
                description: "Reads a file from disk".into(),
                parameters: json!({"type": "object", "properties": {"path": {"type": "string"}}}),
            }],
            max_output_tokens: 0,
        };

        let full_tokens = estimate_request(&full);

        let mut without_text = full.clone();
        without_text.messages[0] = Message::user_text("");
        assert!(estimate_request(&without_text) < full_tokens);

        let mut without_tool_call = full.clone();
        without_tool_call.messages.remove(1);
        assert!(estimate_request(&without_tool_call) < full_tokens);

        let mut without_tool_result = full.clone();
        without_tool_result.messages.remove(2);
        assert!(estimate_request(&without_tool_result) < full_tokens);

        let mut without_blob = full.clone();
        without_blob.messages.remove(3);
        assert!(estimate_request(&without_blob) < full_tokens);

        let mut without_system = full.clone();
        without_system.system_instruction = None;
        assert!(estimate_request(&without_system) < full_tokens);

        let mut without_tools = full.clone();
        without_tools.tools.clear();
        assert!(estimate_request(&without_tools) < full_tokens);
    }

    #[test]
    fn empty_request_is_zero() {
        let req = ConversationRequest::default();
        assert_eq!(estimate_request(&req), 0);
    }

    #[test]
    fn single_message_matches_base() {
        let req = base_request();
        assert_eq!(estimate_request(&req), estimate_message(&req.messages[0]));
    }
}

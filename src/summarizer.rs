//! C4 — Summarizer.
//!
//! Builds the summarization prompt, invokes the caller-supplied LLM, and
//! falls back to a mechanical truncation if that call fails or returns
//! nothing. Grounded on the teacher's `COMPACTION_PROMPT`/
//! `PARTIAL_COMPACTION_PROMPT` constants in `context.rs` for the
//! four-section prompt shape, and on deepagents' `trim_for_summary`/
//! `format_messages` for the transcript-rendering and input-truncation
//! approach (tool-result payloads excluded from the rendered transcript
//! there too, for the same reason: decoupling summarization input size
//! from tool response size).

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::estimator;
use crate::provider::{final_text, SummarizerProvider};
use crate::types::{ConversationRequest, Message, Part, Role, TodoItem, TodoStatus};

const SYSTEM_PROMPT: &str = "You are summarizing a long-running agent conversation so it can \
continue with a smaller context window. Produce a summary with exactly these four sections, \
each as a markdown heading:\n\
## Current State\n\
## Key Information\n\
## Context & Decisions\n\
## Exact Next Steps\n\
Be concrete. Do not pad with generic commentary.";

const FALLBACK_CHARS_PER_MESSAGE: usize = 200;

/// Produce a summary for `messages`, falling back to a mechanical
/// truncation if the LLM call fails or returns empty content. Never
/// returns an error — degraded quality is explicitly preferred to
/// propagating failure (spec.md §4.4).
pub async fn summarize(
    provider: &dyn SummarizerProvider,
    messages: &[Message],
    previous_summary: Option<&str>,
    buffer_tokens: u32,
    todos: &[TodoItem],
    cancel: &CancellationToken,
) -> String {
    let word_cap = ((buffer_tokens as f64) * 0.50 * 0.75).floor() as u32;
    let output_cap = ((buffer_tokens as f64) * 0.50).floor() as u32;

    let system = format!("{SYSTEM_PROMPT}\n\nKeep the summary under {word_cap} words.");
    let user = build_user_prompt(messages, previous_summary, todos);

    let request = ConversationRequest {
        messages: vec![Message::user_text(user)],
        system_instruction: Some(system),
        tools: vec![],
        max_output_tokens: output_cap,
    };

    match provider.generate(&request, cancel).await {
        Ok(fragments) => match final_text(&fragments) {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                warn!("summarizer returned empty content, using fallback summary");
                fallback_summary(messages, previous_summary)
            }
        },
        Err(err) => {
            warn!(error = %err, "summarizer LLM call failed, using fallback summary");
            fallback_summary(messages, previous_summary)
        }
    }
}

fn build_user_prompt(messages: &[Message], previous_summary: Option<&str>, todos: &[TodoItem]) -> String {
    let mut out = String::new();

    if let Some(previous) = previous_summary {
        if !previous.is_empty() {
            out.push_str("Previous summary:\n");
            out.push_str(previous);
            out.push_str("\n\n---\n\n");
        }
    }

    out.push_str("Transcript:\n");
    for message in messages {
        render_message(&mut out, message);
    }

    if !todos.is_empty() {
        out.push_str("\n[Current todo list]\n");
        out.push_str("Carry these tasks forward under a \"## Todo List\" section:\n");
        for todo in todos {
            let status = match todo.status {
                TodoStatus::Pending => "pending",
                TodoStatus::InProgress => "in progress",
                TodoStatus::Completed => "completed",
            };
            out.push_str(&format!("- ({status}) {}\n", todo.content));
        }
    }

    out
}

fn render_message(out: &mut String, message: &Message) {
    let role = role_label(message.role);
    for part in &message.parts {
        match part {
            Part::Text(text) => out.push_str(&format!("{role}: {text}\n")),
            Part::ToolCall { name, .. } => {
                out.push_str(&format!("{role}: [called tool: {name}]\n"))
            }
            Part::ToolResult { name, .. } => {
                out.push_str(&format!("{role}: [tool {name} returned a result]\n"))
            }
            Part::InlineBlob { mime_type, .. } => {
                out.push_str(&format!("{role}: [inline blob, {mime_type}]\n"))
            }
        }
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

/// Trim `messages` so its heuristic token count fits under the summarizer's
/// own input budget, dropping from the oldest end but never below two
/// messages.
pub fn truncate_for_summarizer(messages: &[Message], context_window: u32) -> Vec<Message> {
    let limit = (context_window as f64 * 0.80) as u32;

    let mut start = 0;
    while messages.len() - start > 2 && estimator::estimate_messages(&messages[start..]) > limit {
        start += 1;
    }
    messages[start..].to_vec()
}

/// Mechanical fallback when the LLM call fails or returns nothing:
/// `role: first 200 chars of each text message` with ellipsis for longer
/// ones, prepended by the previous summary separated by a horizontal rule.
fn fallback_summary(messages: &[Message], previous_summary: Option<&str>) -> String {
    let mut lines = Vec::new();
    for message in messages {
        let role = role_label(message.role);
        for part in &message.parts {
            if let Part::Text(text) = part {
                let truncated = truncate_chars(text, FALLBACK_CHARS_PER_MESSAGE);
                lines.push(format!("{role}: {truncated}"));
            }
        }
    }
    let body = lines.join("\n");

    match previous_summary {
        Some(previous) if !previous.is_empty() => format!("{previous}\n\n---\n\n{body}"),
        _ => body,
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max).collect();
    format!("{truncated}...")
}

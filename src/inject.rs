//! Summary injection and continuation messages — spec.md §4.8/§4.9.
//!
//! The enclosing runtime rebuilds `request.messages` from an immutable,
//! append-only event log on every call. A strategy that only edits the
//! request in place is stateless across calls; the watermark stored in
//! per-agent state is what lets a freshly rebuilt request skip the portion
//! already folded into the summary. No teacher module needed this — the
//! teacher's `ManagedContextManager` owns its own mutable message buffer
//! across calls and never gets rebuilt out from under it — so this is
//! built directly from the documented algorithm.

use crate::types::Message;

/// Text a summary message's first part must start with for `inject_summary`
/// to recognize it as already present.
pub const SUMMARY_MARKER: &str = "[Previous conversation summary]";

fn summary_message(summary: &str) -> Message {
    Message::user_text(format!(
        "{SUMMARY_MARKER}\n{summary}\n[End of summary — conversation continues below]"
    ))
}

fn starts_with_summary(messages: &[Message]) -> bool {
    messages
        .first()
        .and_then(|m| m.first_text())
        .is_some_and(|t| t.starts_with(SUMMARY_MARKER))
}

/// Re-materialize `summary` at the head of `request_messages`, replacing
/// the watermark-prefix of messages that it already covers.
///
/// Idempotent: if `request_messages` already begins with a summary marker,
/// this is a no-op (invariant 5, spec.md §8).
pub fn inject_summary(request_messages: &mut Vec<Message>, summary: &str, watermark: u64) {
    if starts_with_summary(request_messages) {
        return;
    }

    let head = summary_message(summary);

    let watermark = watermark as usize;
    if watermark > 0 && watermark <= request_messages.len() {
        let tail = request_messages.split_off(watermark);
        *request_messages = std::iter::once(head).chain(tail).collect();
    } else {
        request_messages.insert(0, head);
    }
}

/// Unconditionally replace `request_messages` with `[summary] ++ recent`.
/// `recent` may be empty — the full-summary case used by the threshold
/// strategy.
pub fn replace_summary(request_messages: &mut Vec<Message>, summary: &str, recent: Vec<Message>) {
    *request_messages = std::iter::once(summary_message(summary))
        .chain(recent)
        .collect();
}

/// Build the synthetic user-role message appended after a summary so the
/// next turn can resume without asking the user to repeat anything.
pub fn continuation_message(latest_user_text: Option<&str>) -> Message {
    let text = match latest_user_text {
        Some(request) => format!(
            "[System: The conversation was compacted because it exceeded the context \
             window. The summary above contains all prior context. The user's current \
             request is: `{request}`. Continue working on this request without asking \
             the user to repeat anything.]"
        ),
        None => "[System: The conversation was compacted because it exceeded the context \
                  window. The summary above contains all prior context. Continue working \
                  on the user's request without asking them to repeat anything.]"
            .to_string(),
    };
    Message::user_text(text)
}

/// Find the most recent user message's text, for use as the continuation
/// message's quoted request.
pub fn latest_user_text(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == crate::types::Role::User)
        .and_then(|m| m.first_text())
}

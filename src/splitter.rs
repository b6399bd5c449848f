//! C3 — Pair-Boundary Splitter.
//!
//! Finds a safe index to split a message sequence at, without ever cutting
//! inside an in-flight (model tool-call, user tool-result) pair. Grounded
//! on two independent prior-art implementations of the same idea: the
//! `pending_tool_calls` backward scan in Safe-Coder's context manager and
//! the `Role::Tool`-skipping backward walk in deepagents' summarization
//! middleware — both land on the same two-phase shape this function uses.

use tracing::warn;

use crate::types::Message;

/// Adjust a candidate split index so `[0, k')` / `[k', len)` never falls
/// inside an unfinished tool pair. Always returns a value in `[1, len-1]`
/// for `len >= 2`.
///
/// # Panics
/// Panics if `messages.len() < 2` — callers must not offer a sequence too
/// short to split.
pub fn safe_split(messages: &[Message], candidate: usize) -> usize {
    let len = messages.len();
    assert!(len >= 2, "safe_split requires at least two messages");

    let k = candidate.clamp(1, len - 1);

    if let Some(k) = backward_walk(messages, k) {
        return k;
    }

    let k = forward_walk(messages, k);
    if k <= 1 {
        warn!(len, "pair-boundary splitter hit the floor, at most one message compacted");
    }
    k.clamp(1, len - 1)
}

/// Starting at `k`, walk backward while the message immediately before the
/// split point is a tool-call or tool-result. Returns `None` if the walk
/// reaches the start of the sequence (a pure-tool conversation).
fn backward_walk(messages: &[Message], k: usize) -> Option<usize> {
    let mut k = k;
    while k > 0 && is_tool_message(&messages[k - 1]) {
        k -= 1;
    }
    if k == 0 {
        None
    } else {
        Some(k)
    }
}

/// Fallback for a pure-tool run: walk forward from the original candidate,
/// skip past any tool-call, and stop immediately after the next
/// tool-result, seating the split at a pair seam.
fn forward_walk(messages: &[Message], k: usize) -> usize {
    let len = messages.len();
    let mut i = k;
    while i < len {
        if messages[i].has_tool_result() {
            return (i + 1).min(len - 1).max(1);
        }
        i += 1;
    }
    // No tool-result found ahead either; floor to 1 per the clamp rule.
    1
}

fn is_tool_message(message: &Message) -> bool {
    message.has_tool_call() || message.has_tool_result()
}

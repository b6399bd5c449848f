//! C7 — Sliding-Window Strategy.
//!
//! Same contract as the threshold strategy, but triggered by turn count
//! rather than token estimate, and preserving a recent tail instead of
//! discarding everything. Grounded on the teacher's partial-compaction
//! branch in `ManagedContextManager::compact` (the branch taken once
//! `compaction_state.has_compacted` is true, which keeps `keep_recent`
//! messages) plus Safe-Coder's token-based split retry for the
//! shrinking-tail loop.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::estimator::estimate_request;
use crate::inject::{continuation_message, inject_summary, latest_user_text, replace_summary};
use crate::splitter::safe_split;
use crate::state::StateAccessor;
use crate::summarizer::{summarize, truncate_for_summarizer};
use crate::types::ConversationRequest;

use super::{buffer_for, threshold_for, CompactionOutcome, CompactionStrategy, StrategyContext};

const MAX_ATTEMPTS: u32 = 3;
const MIN_RECENT_KEEP: usize = 3;
const DEFAULT_MAX_TURNS: u32 = 20;

pub struct SlidingWindowStrategy {
    max_turns: u32,
}

impl SlidingWindowStrategy {
    /// `max_turns <= 0` defaults to 20, per spec.md §6's
    /// `WithSlidingWindow` builder note.
    pub fn new(max_turns: i64) -> Self {
        let max_turns = if max_turns <= 0 {
            DEFAULT_MAX_TURNS
        } else {
            max_turns as u32
        };
        Self { max_turns }
    }
}

#[async_trait]
impl CompactionStrategy for SlidingWindowStrategy {
    async fn compact(
        &self,
        ctx: &StrategyContext<'_>,
        request: &mut ConversationRequest,
    ) -> CompactionOutcome {
        let accessor = StateAccessor::new(ctx.state, ctx.agent_id);
        let state = accessor.load().await;

        let total = request.messages.len() as u64;

        if total.saturating_sub(state.watermark) <= self.max_turns as u64 {
            if !state.summary.is_empty() {
                inject_summary(&mut request.messages, &state.summary, state.watermark);
            }
            let tokens = estimate_request(request);
            return CompactionOutcome {
                compacted: false,
                pre_tokens: tokens,
                post_tokens: tokens,
            };
        }

        let pre_tokens = estimate_request(request);
        let context_window = ctx.context_window();
        let threshold = threshold_for(context_window);
        let buffer = buffer_for(context_window);

        let mut recent_keep = (self.max_turns as f64 * 0.30).floor().max(3.0) as usize;

        // Every attempt re-splits the *original* pre-compaction sequence —
        // retrying against an already-summarized request would silently
        // fold the previous attempt's summary into the next one's "old"
        // half instead of re-trying with a smaller tail over the same
        // source material.
        let original_messages = request.messages.clone();
        let latest_text = latest_user_text(&original_messages).map(str::to_string);

        for attempt in 1..=MAX_ATTEMPTS {
            let messages = &original_messages;
            if messages.len() <= recent_keep {
                warn!(agent_id = ctx.agent_id, "nothing to compact, recent tail covers everything");
                return CompactionOutcome {
                    compacted: false,
                    pre_tokens,
                    post_tokens: pre_tokens,
                };
            }

            let candidate = messages.len() - recent_keep;
            let split = safe_split(messages, candidate);

            let old = messages[..split].to_vec();
            let recent = messages[split..].to_vec();

            if old.is_empty() {
                warn!(agent_id = ctx.agent_id, "nothing to compact on this attempt");
                return CompactionOutcome {
                    compacted: false,
                    pre_tokens,
                    post_tokens: pre_tokens,
                };
            }

            info!(
                agent_id = ctx.agent_id,
                attempt, recent_keep, split, "sliding window strategy compacting"
            );

            let for_summary = truncate_for_summarizer(&old, context_window);

            let new_summary = summarize(
                ctx.provider,
                &for_summary,
                Some(state.summary.as_str()),
                buffer,
                ctx.todos,
                ctx.cancel,
            )
            .await;

            accessor.persist_compaction(&new_summary, total).await;

            replace_summary(&mut request.messages, &new_summary, recent);
            request
                .messages
                .push(continuation_message(latest_text.as_deref()));

            // Reset only after the summary is persisted *and* the request
            // is rewritten (spec.md §5's ordering invariant).
            accessor.reset_calibration().await;

            let post_tokens = estimate_request(request);

            if post_tokens < threshold {
                return CompactionOutcome {
                    compacted: true,
                    pre_tokens,
                    post_tokens,
                };
            }

            if recent_keep <= MIN_RECENT_KEEP {
                return CompactionOutcome {
                    compacted: true,
                    pre_tokens,
                    post_tokens,
                };
            }
            recent_keep = (recent_keep / 2).max(MIN_RECENT_KEEP);
        }

        CompactionOutcome {
            compacted: true,
            pre_tokens,
            post_tokens: estimate_request(request),
        }
    }

    fn name(&self) -> &'static str {
        "sliding_window"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockSummarizerProvider;
    use crate::registry::StaticModelRegistry;
    use crate::state::InMemoryStateStore;
    use crate::types::Message;
    use tokio_util::sync::CancellationToken;

    fn ctx<'a>(
        state: &'a InMemoryStateStore,
        provider: &'a MockSummarizerProvider,
        registry: &'a StaticModelRegistry,
        cancel: &'a CancellationToken,
        max_tokens_override: u32,
    ) -> StrategyContext<'a> {
        StrategyContext {
            agent_id: "agent-1",
            model_id: "test-model",
            state,
            provider,
            registry,
            max_tokens_override,
            todos: &[],
            cancel,
        }
    }

    #[tokio::test]
    async fn within_max_turns_is_a_no_op() {
        let state = InMemoryStateStore::new();
        let provider = MockSummarizerProvider::returning("summary");
        let registry = StaticModelRegistry::new();
        let cancel = CancellationToken::new();
        let strategy = SlidingWindowStrategy::new(10);

        let mut request = ConversationRequest {
            messages: (0..5).map(|i| Message::user_text(format!("m{i}"))).collect(),
            system_instruction: None,
            tools: vec![],
            max_output_tokens: 0,
        };

        let c = ctx(&state, &provider, &registry, &cancel, 200_000);
        let outcome = strategy.compact(&c, &mut request).await;
        assert!(!outcome.compacted);
        assert_eq!(request.messages.len(), 5);
    }

    #[tokio::test]
    async fn negative_or_zero_max_turns_defaults_to_twenty() {
        let strategy = SlidingWindowStrategy::new(0);
        assert_eq!(strategy.max_turns, 20);
        let strategy = SlidingWindowStrategy::new(-5);
        assert_eq!(strategy.max_turns, 20);
    }

    #[tokio::test]
    async fn exceeding_max_turns_compacts_and_keeps_a_tail() {
        let state = InMemoryStateStore::new();
        let provider = MockSummarizerProvider::returning("summary");
        let registry = StaticModelRegistry::new();
        let cancel = CancellationToken::new();
        let strategy = SlidingWindowStrategy::new(10);

        let mut request = ConversationRequest {
            messages: (0..50).map(|i| Message::user_text(format!("m{i}"))).collect(),
            system_instruction: None,
            tools: vec![],
            max_output_tokens: 0,
        };

        let c = ctx(&state, &provider, &registry, &cancel, 1_000_000);
        let outcome = strategy.compact(&c, &mut request).await;

        assert!(outcome.compacted);
        // summary + kept tail (>= 1) + continuation
        assert!(request.messages.len() >= 3);
        assert!(request.messages.len() < 50);

        let accessor = StateAccessor::new(&state, "agent-1");
        assert_eq!(accessor.load().await.watermark, 50);
    }

    #[tokio::test]
    async fn retries_shrink_the_tail_until_convergence() {
        // Scenario S6: retry loop must not panic even when the first pass
        // stays above threshold; floor at recent_keep = 3 still converges
        // because full-summary text is tiny regardless of tail size.
        let state = InMemoryStateStore::new();
        let provider = MockSummarizerProvider::returning("short");
        let registry = StaticModelRegistry::new().with_model("test-model", 8_000, 4_096);
        let cancel = CancellationToken::new();
        let strategy = SlidingWindowStrategy::new(10);

        let mut request = ConversationRequest {
            messages: (0..50)
                .map(|i| Message::user_text(format!("turn {i}: {}", "x".repeat(500))))
                .collect(),
            system_instruction: None,
            tools: vec![],
            max_output_tokens: 0,
        };

        let c = ctx(&state, &provider, &registry, &cancel, 0);
        let outcome = strategy.compact(&c, &mut request).await;
        assert!(outcome.compacted);
    }
}

//! C6 — Threshold Strategy.
//!
//! Full-summary compaction triggered by calibrated token count crossing a
//! window-size-dependent threshold. Grounded on the teacher's
//! `ManagedContextManager::compact` full-replace branch — the branch it
//! takes on the very first compaction, before `compaction_state.has_compacted`
//! is set. Unlike the teacher, this strategy never keeps a partial tail:
//! spec.md §4.6's rationale is that a kept tail can itself contain a
//! tool result larger than the window, a failure mode the teacher's
//! partial-compaction branch doesn't need to worry about because it never
//! discards the system/tool scaffolding the way a rebuilt request does.

use async_trait::async_trait;
use tracing::info;

use crate::calibrator::calibrate;
use crate::estimator::estimate_request;
use crate::inject::{continuation_message, inject_summary, latest_user_text, replace_summary};
use crate::state::StateAccessor;
use crate::summarizer::{summarize, truncate_for_summarizer};
use crate::types::ConversationRequest;

use super::{buffer_for, threshold_for, CompactionOutcome, CompactionStrategy, StrategyContext};

pub struct ThresholdStrategy;

impl ThresholdStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ThresholdStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompactionStrategy for ThresholdStrategy {
    async fn compact(
        &self,
        ctx: &StrategyContext<'_>,
        request: &mut ConversationRequest,
    ) -> CompactionOutcome {
        let accessor = StateAccessor::new(ctx.state, ctx.agent_id);
        let state = accessor.load().await;

        let total = request.messages.len() as u64;

        if !state.summary.is_empty() {
            inject_summary(&mut request.messages, &state.summary, state.watermark);
        }

        let pre_tokens = estimate_request(request);
        let tokens = calibrate(pre_tokens, state.real_tokens, state.last_heuristic);

        let context_window = ctx.context_window();
        let threshold = threshold_for(context_window);

        if tokens < threshold {
            return CompactionOutcome {
                compacted: false,
                pre_tokens: tokens,
                post_tokens: tokens,
            };
        }

        info!(
            agent_id = ctx.agent_id,
            tokens, threshold, "threshold strategy compacting"
        );

        let for_summary = truncate_for_summarizer(&request.messages, context_window);
        let latest_text = latest_user_text(&request.messages).map(str::to_string);
        let buffer = buffer_for(context_window);

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

        replace_summary(&mut request.messages, &new_summary, vec![]);
        request
            .messages
            .push(continuation_message(latest_text.as_deref()));

        // Reset only after the summary is persisted *and* the request is
        // rewritten (spec.md §5's ordering invariant).
        accessor.reset_calibration().await;

        let post_tokens = estimate_request(request);

        CompactionOutcome {
            compacted: true,
            pre_tokens: tokens,
            post_tokens,
        }
    }

    fn name(&self) -> &'static str {
        "threshold"
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
    async fn below_threshold_is_a_no_op() {
        let state = InMemoryStateStore::new();
        let provider = MockSummarizerProvider::returning("summary");
        let registry = StaticModelRegistry::new();
        let cancel = CancellationToken::new();
        let strategy = ThresholdStrategy::new();

        let mut request = ConversationRequest {
            messages: vec![Message::user_text("short message")],
            system_instruction: None,
            tools: vec![],
            max_output_tokens: 0,
        };

        let c = ctx(&state, &provider, &registry, &cancel, 200_000);
        let outcome = strategy.compact(&c, &mut request).await;

        assert!(!outcome.compacted);
        assert_eq!(request.messages.len(), 1);
    }

    #[tokio::test]
    async fn above_threshold_replaces_with_summary_and_continuation() {
        // Scenario S2: small window, many large text messages.
        let state = InMemoryStateStore::new();
        let provider = MockSummarizerProvider::returning("concise summary");
        let registry = StaticModelRegistry::new();
        let cancel = CancellationToken::new();
        let strategy = ThresholdStrategy::new();

        let messages: Vec<Message> = (0..20)
            .map(|i| Message::user_text(format!("turn {i}: {}", "x".repeat(3000))))
            .collect();
        let total = messages.len() as u64;

        let mut request = ConversationRequest {
            messages,
            system_instruction: None,
            tools: vec![],
            max_output_tokens: 0,
        };

        let c = ctx(&state, &provider, &registry, &cancel, 8_000);
        let outcome = strategy.compact(&c, &mut request).await;

        assert!(outcome.compacted);
        assert_eq!(request.messages.len(), 2);

        let accessor = StateAccessor::new(&state, "agent-1");
        let persisted = accessor.load().await;
        assert_eq!(persisted.watermark, total);
        assert!(!persisted.summary.is_empty());
        assert_eq!(persisted.real_tokens, 0);
        assert_eq!(persisted.last_heuristic, 0);
    }

    #[tokio::test]
    async fn fallback_summary_still_compacts_on_llm_failure() {
        // Scenario S5.
        let state = InMemoryStateStore::new();
        let provider = MockSummarizerProvider::failing();
        let registry = StaticModelRegistry::new();
        let cancel = CancellationToken::new();
        let strategy = ThresholdStrategy::new();

        let messages: Vec<Message> = (0..20)
            .map(|i| Message::user_text(format!("turn {i}: {}", "x".repeat(3000))))
            .collect();

        let mut request = ConversationRequest {
            messages,
            system_instruction: None,
            tools: vec![],
            max_output_tokens: 0,
        };

        let c = ctx(&state, &provider, &registry, &cancel, 8_000);
        let outcome = strategy.compact(&c, &mut request).await;

        assert!(outcome.compacted);
        assert_eq!(request.messages.len(), 2);
    }

    #[tokio::test]
    async fn giant_tool_result_still_converges() {
        // Scenario S3.
        use crate::types::{Part, Role};

        let state = InMemoryStateStore::new();
        let provider = MockSummarizerProvider::returning("summary of huge result");
        let registry = StaticModelRegistry::new();
        let cancel = CancellationToken::new();
        let strategy = ThresholdStrategy::new();

        let messages = vec![
            Message::user_text("short request"),
            Message {
                role: Role::Model,
                parts: vec![Part::ToolCall {
                    name: "dump".into(),
                    args: Default::default(),
                }],
            },
            Message {
                role: Role::User,
                parts: vec![Part::ToolResult {
                    name: "dump".into(),
                    result: serde_json::Value::String("x".repeat(1_000_000)),
                }],
            },
            Message::model_text("done"),
        ];

        let mut request = ConversationRequest {
            messages,
            system_instruction: None,
            tools: vec![],
            max_output_tokens: 0,
        };

        let c = ctx(&state, &provider, &registry, &cancel, 8_000);
        let outcome = strategy.compact(&c, &mut request).await;

        assert!(outcome.compacted);
        assert_eq!(request.messages.len(), 2);
        assert!(outcome.post_tokens < 5_000);
    }
}

//! Unifies C6 (threshold) and C7 (sliding-window) behind one interface the
//! dispatcher can hold as `Box<dyn CompactionStrategy>` — mirroring the
//! teacher's `ContextManager` trait, which gives `ManagedContextManager`
//! the same "one trait, needs_compaction + compact" shape. spec.md implies
//! this via "pluggable compaction strategies" (§1(b)) without naming a
//! trait; this is the supplemented piece that makes the dispatcher's
//! registry actually polymorphic.

pub mod sliding_window;
pub mod threshold;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::registry::ModelRegistry;
use crate::state::StateStore;
use crate::provider::SummarizerProvider;
use crate::types::{ConversationRequest, TodoItem};

/// Everything a strategy needs to make and act on a compaction decision
/// for one agent, for the duration of a single `before_model` call.
pub struct StrategyContext<'a> {
    pub agent_id: &'a str,
    pub model_id: &'a str,
    pub state: &'a dyn StateStore,
    pub provider: &'a dyn SummarizerProvider,
    pub registry: &'a dyn ModelRegistry,
    /// 0 means "use the registry's context window for `model_id`".
    pub max_tokens_override: u32,
    pub todos: &'a [TodoItem],
    pub cancel: &'a CancellationToken,
}

impl<'a> StrategyContext<'a> {
    pub fn context_window(&self) -> u32 {
        if self.max_tokens_override > 0 {
            self.max_tokens_override
        } else {
            self.registry.context_window(self.model_id)
        }
    }
}

/// Result of one `compact` call, used for the optional observability hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactionOutcome {
    pub compacted: bool,
    pub pre_tokens: u32,
    pub post_tokens: u32,
}

/// A pluggable compaction decision + action. Implementations never return
/// an error — on internal failure the worst case is degraded compaction,
/// never a blocked request (spec.md §4.6).
#[async_trait]
pub trait CompactionStrategy: Send + Sync {
    async fn compact(
        &self,
        ctx: &StrategyContext<'_>,
        request: &mut ConversationRequest,
    ) -> CompactionOutcome;

    fn name(&self) -> &'static str;
}

/// `buffer`/`threshold` computation shared by both strategies' token-based
/// decisions (spec.md §4.6): a fixed 20k buffer for large windows, a
/// proportional 20% buffer for smaller ones.
pub(crate) fn buffer_for(context_window: u32) -> u32 {
    if context_window >= 200_000 {
        20_000
    } else {
        (context_window as f64 * 0.20) as u32
    }
}

pub(crate) fn threshold_for(context_window: u32) -> u32 {
    context_window.saturating_sub(buffer_for(context_window))
}

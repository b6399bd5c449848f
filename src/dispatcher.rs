//! C8 — Plugin Dispatcher.
//!
//! Per-agent strategy registry that routes the runtime's `before_model`/
//! `after_model` callbacks to the right strategy. Grounded on the
//! teacher's `Agent` struct as an orchestration-object precedent (the
//! thing a host program constructs once and calls into repeatedly), but
//! narrowed drastically: the teacher's `Agent::run_loop` owns inference,
//! tool execution and session checkpointing end to end, whereas this
//! dispatcher only ever touches the two compaction callbacks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::estimator::estimate_request;
use crate::provider::SummarizerProvider;
use crate::registry::ModelRegistry;
use crate::state::{StateAccessor, StateStore};
use crate::strategy::sliding_window::SlidingWindowStrategy;
use crate::strategy::threshold::ThresholdStrategy;
use crate::strategy::{CompactionOutcome, CompactionStrategy, StrategyContext};
use crate::types::{ConversationRequest, ResponseFragment, TodoItem};

/// Observability hook mirroring the teacher's `AgentEvent::Compacted`
/// notification. Purely a post-hoc callback, not a spec.md requirement —
/// a default no-op implementation means most callers never think about
/// it.
pub trait CompactionObserver: Send + Sync {
    fn on_compacted(&self, agent_id: &str, strategy: &str, outcome: CompactionOutcome);
}

struct NoopObserver;
impl CompactionObserver for NoopObserver {
    fn on_compacted(&self, _agent_id: &str, _strategy: &str, _outcome: CompactionOutcome) {}
}

/// Per-agent registration: which strategy, which model id, and any
/// `WithMaxTokens` override.
struct AgentRegistration {
    strategy: Box<dyn CompactionStrategy>,
    model_id: String,
    max_tokens_override: u32,
}

/// Builder for one agent's registration, returned by
/// [`PluginDispatcher::register_agent`].
pub struct AgentRegistrationBuilder<'a> {
    dispatcher: &'a PluginDispatcher,
    agent_id: String,
    model_id: String,
    max_tokens_override: u32,
    sliding_window_turns: Option<i64>,
}

impl<'a> AgentRegistrationBuilder<'a> {
    /// Selects the turn-based strategy. `max_turns <= 0` defaults to 20.
    pub fn with_sliding_window(mut self, max_turns: i64) -> Self {
        self.sliding_window_turns = Some(max_turns);
        self
    }

    /// Bypasses the model registry's context-window lookup for this agent.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens_override = max_tokens;
        self
    }

    pub async fn finish(self) {
        let strategy: Box<dyn CompactionStrategy> = match self.sliding_window_turns {
            Some(turns) => Box::new(SlidingWindowStrategy::new(turns)),
            None => Box::new(ThresholdStrategy::new()),
        };
        let registration = AgentRegistration {
            strategy,
            model_id: self.model_id,
            max_tokens_override: self.max_tokens_override,
        };
        self.dispatcher
            .agents
            .write()
            .await
            .insert(self.agent_id.clone(), Arc::new(Mutex::new(registration)));
    }
}

/// Routes `before_model`/`after_model` callbacks to the registered
/// strategy for each agent, holding an exclusive lock per agent for the
/// duration of a compaction's critical section (spec.md §5) so that if
/// the runtime ever delivers overlapping callbacks for the same agent,
/// they serialise instead of racing on the state store.
pub struct PluginDispatcher {
    agents: RwLock<HashMap<String, Arc<Mutex<AgentRegistration>>>>,
    state: Arc<dyn StateStore>,
    provider: Arc<dyn SummarizerProvider>,
    registry: Arc<dyn ModelRegistry>,
    observer: Arc<dyn CompactionObserver>,
}

impl PluginDispatcher {
    pub fn new(
        state: Arc<dyn StateStore>,
        provider: Arc<dyn SummarizerProvider>,
        registry: Arc<dyn ModelRegistry>,
    ) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            state,
            provider,
            registry,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn CompactionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Register an agent with the default threshold strategy, using the
    /// model registry's context window for `model_id` unless overridden
    /// via the returned builder.
    pub fn register_agent<'a>(
        &'a self,
        agent_id: impl Into<String>,
        model_id: impl Into<String>,
    ) -> AgentRegistrationBuilder<'a> {
        AgentRegistrationBuilder {
            dispatcher: self,
            agent_id: agent_id.into(),
            model_id: model_id.into(),
            max_tokens_override: 0,
            sliding_window_turns: None,
        }
    }

    /// Runs compaction for `agent_id` against `request`, then records the
    /// heuristic of the final (post-compaction) request as `last-heuristic`
    /// per spec.md §6's `BeforeModelCallback` contract.
    ///
    /// Per spec.md §7, an unregistered agent or an empty request is a
    /// silent no-op — the dispatcher never blocks an LLM call.
    pub async fn before_model(
        &self,
        agent_id: &str,
        request: &mut ConversationRequest,
        todos: &[TodoItem],
        cancel: &CancellationToken,
    ) {
        if request.messages.is_empty() {
            debug!(agent_id, "empty request, dispatcher short-circuits");
            return;
        }

        let registration = {
            let agents = self.agents.read().await;
            match agents.get(agent_id) {
                Some(r) => Arc::clone(r),
                None => {
                    warn!(agent_id, "no strategy registered, dispatcher short-circuits");
                    return;
                }
            }
        };

        let registration = registration.lock().await;

        let ctx = StrategyContext {
            agent_id,
            model_id: &registration.model_id,
            state: self.state.as_ref(),
            provider: self.provider.as_ref(),
            registry: self.registry.as_ref(),
            max_tokens_override: registration.max_tokens_override,
            todos,
            cancel,
        };

        let outcome = registration.strategy.compact(&ctx, request).await;

        if outcome.compacted {
            self.observer
                .on_compacted(agent_id, registration.strategy.name(), outcome);
        }

        let accessor = StateAccessor::new(self.state.as_ref(), agent_id);
        accessor
            .persist_last_heuristic(estimate_request(request))
            .await;
    }

    /// Persists the provider-reported prompt-token count for the next
    /// round's calibration, per spec.md §6's `AfterModelCallback` contract.
    /// Streaming partials carry no authoritative usage and are ignored.
    pub async fn after_model(&self, agent_id: &str, response: &ResponseFragment) {
        if response.partial {
            return;
        }
        let Some(usage) = response.usage else {
            return;
        };
        let accessor = StateAccessor::new(self.state.as_ref(), agent_id);
        accessor.persist_real_tokens(usage.prompt_tokens).await;
    }
}

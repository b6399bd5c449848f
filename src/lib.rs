//! ContextGuard — the compaction-decision core of an agent-runtime plugin
//! that keeps a multi-turn LLM conversation inside its provider's context
//! window. On every call the registered [`dispatcher::PluginDispatcher`]
//! decides whether the request is about to exceed the window and, if so,
//! replaces the oldest portion of the conversation with a machine-generated
//! summary so the request fits — no user intervention, no lost
//! continuation.
//!
//! Wire it up with a [`state::StateStore`], a [`provider::SummarizerProvider`],
//! and a [`registry::ModelRegistry`]; register each agent against a
//! [`dispatcher::PluginDispatcher`]; call [`dispatcher::PluginDispatcher::before_model`]
//! and [`dispatcher::PluginDispatcher::after_model`] from the surrounding
//! runtime's callbacks. See `demos/chat.rs` for a minimal wiring.

pub mod calibrator;
pub mod dispatcher;
pub mod error;
pub mod estimator;
pub mod inject;
pub mod provider;
pub mod registry;
pub mod splitter;
pub mod state;
pub mod strategy;
pub mod summarizer;
pub mod types;

pub use dispatcher::{AgentRegistrationBuilder, CompactionObserver, PluginDispatcher};
pub use error::{StateError, SummarizerError};
pub use provider::SummarizerProvider;
pub use registry::{ModelRegistry, StaticModelRegistry, DEFAULT_CONTEXT_WINDOW, DEFAULT_MAX_OUTPUT};
pub use state::{AgentState, FileStateStore, InMemoryStateStore, StateAccessor, StateStore};
pub use strategy::sliding_window::SlidingWindowStrategy;
pub use strategy::threshold::ThresholdStrategy;
pub use strategy::{CompactionOutcome, CompactionStrategy, StrategyContext};
pub use types::{
    ConversationRequest, Message, Part, ResponseFragment, Role, TodoItem, TodoStatus,
    ToolDeclaration, UsageMetadata,
};

//! C9 — Model Registry interface.
//!
//! Read-only, safe for concurrent reads. A registry that refreshes from a
//! remote source must keep serving the last successfully fetched value on
//! refresh failure, and must default sensibly for a model id it has never
//! seen (128 000 / 4 096 per spec.md §6). This crate defines only the
//! trait plus a static reference implementation; a concrete
//! remote-refreshing registry is the enclosing runtime's concern (spec.md
//! §1's out-of-scope list).

use std::collections::HashMap;

/// Default context window for an unknown model id.
pub const DEFAULT_CONTEXT_WINDOW: u32 = 128_000;

/// Default output cap for an unknown model id.
pub const DEFAULT_MAX_OUTPUT: u32 = 4_096;

pub trait ModelRegistry: Send + Sync {
    fn context_window(&self, model_id: &str) -> u32;
    fn default_max_output(&self, model_id: &str) -> u32;
}

/// A fixed, in-process table of model metadata with the documented
/// defaults for anything not listed. Suitable as the reference
/// implementation for tests and the demo; a production registry backed by
/// a refreshing remote source implements the same trait.
pub struct StaticModelRegistry {
    windows: HashMap<String, u32>,
    outputs: HashMap<String, u32>,
}

impl StaticModelRegistry {
    pub fn new() -> Self {
        Self {
            windows: HashMap::new(),
            outputs: HashMap::new(),
        }
    }

    pub fn with_model(
        mut self,
        model_id: impl Into<String>,
        context_window: u32,
        default_max_output: u32,
    ) -> Self {
        let model_id = model_id.into();
        self.windows.insert(model_id.clone(), context_window);
        self.outputs.insert(model_id, default_max_output);
        self
    }
}

impl Default for StaticModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry for StaticModelRegistry {
    fn context_window(&self, model_id: &str) -> u32 {
        self.windows
            .get(model_id)
            .copied()
            .unwrap_or(DEFAULT_CONTEXT_WINDOW)
    }

    fn default_max_output(&self, model_id: &str) -> u32 {
        self.outputs
            .get(model_id)
            .copied()
            .unwrap_or(DEFAULT_MAX_OUTPUT)
    }
}

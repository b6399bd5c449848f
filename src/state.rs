//! C5 — State Accessor.
//!
//! Per-agent session state, mediated by a runtime-owned key/value store.
//! Grounded on the teacher's `SessionManager` trait / `FileSessionManager`
//! pairing in `session.rs`: a narrow async trait the host implements,
//! plus a couple of reference implementations this crate ships for tests
//! and the demo. Unlike the teacher's session checkpoint (one JSON blob
//! per agent), this store is string-keyed per spec.md §6 — closer in
//! shape to a generic KV cache than to `SessionState`'s single struct.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::StateError;

/// The runtime-owned key/value capability. Per spec.md §6, `Get`/`Set`
/// operate on arbitrary string keys scoped to a single agent by the
/// caller (this crate suffixes every key with the agent id itself, so a
/// single shared store cannot collide across agents).
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StateError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StateError>;
}

const KEY_SUMMARY: &str = "summary";
const KEY_WATERMARK: &str = "watermark";
const KEY_REAL_TOKENS: &str = "real-tokens";
const KEY_LAST_HEURISTIC: &str = "last-heuristic";

/// The four keys spec.md §3 defines for per-agent session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentState {
    pub summary: String,
    pub watermark: u64,
    pub real_tokens: u32,
    pub last_heuristic: u32,
}

/// Wraps a [`StateStore`] with the agent-id key-suffixing, numeric
/// widening tolerance, and swallow-and-log error policy spec.md §4.5
/// requires. State is advisory: a read failure yields the zero/empty
/// default, a write failure is logged and dropped.
pub struct StateAccessor<'a> {
    store: &'a dyn StateStore,
    agent_id: String,
}

impl<'a> StateAccessor<'a> {
    pub fn new(store: &'a dyn StateStore, agent_id: impl Into<String>) -> Self {
        Self {
            store,
            agent_id: agent_id.into(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{name}:{}", self.agent_id)
    }

    pub async fn load(&self) -> AgentState {
        AgentState {
            summary: self.read_string(KEY_SUMMARY).await.unwrap_or_default(),
            watermark: self.read_number(KEY_WATERMARK).await.unwrap_or(0.0) as u64,
            real_tokens: self.read_number(KEY_REAL_TOKENS).await.unwrap_or(0.0) as u32,
            last_heuristic: self.read_number(KEY_LAST_HEURISTIC).await.unwrap_or(0.0) as u32,
        }
    }

    /// Persist a new summary and watermark. Callers MUST follow this with
    /// [`Self::reset_calibration`] only after `request.messages` has been
    /// rewritten with the summary — spec.md §5 requires the calibration
    /// reset to happen after the summary is persisted *and* the request is
    /// rewritten, not before.
    pub async fn persist_compaction(&self, summary: &str, watermark: u64) {
        self.write(KEY_SUMMARY, Value::String(summary.to_string()))
            .await;
        self.write(KEY_WATERMARK, Value::from(watermark)).await;
    }

    /// Reset `real-tokens`/`last-heuristic` so the next turn's calibration
    /// starts from `DEFAULT_FACTOR` instead of comparing against the huge
    /// pre-compaction request (spec.md §4.6(f)).
    pub async fn reset_calibration(&self) {
        self.write(KEY_REAL_TOKENS, Value::from(0)).await;
        self.write(KEY_LAST_HEURISTIC, Value::from(0)).await;
    }

    pub async fn persist_last_heuristic(&self, heuristic: u32) {
        self.write(KEY_LAST_HEURISTIC, Value::from(heuristic)).await;
    }

    pub async fn persist_real_tokens(&self, real_tokens: u32) {
        self.write(KEY_REAL_TOKENS, Value::from(real_tokens)).await;
    }

    async fn read_string(&self, name: &str) -> Option<String> {
        match self.store.get(&self.key(name)).await {
            Ok(Some(Value::String(s))) => Some(s),
            Ok(Some(_)) | Ok(None) => None,
            Err(err) => {
                warn!(key = name, error = %err, "state read failed, defaulting");
                None
            }
        }
    }

    /// Accepts both integer- and float-typed JSON numbers, per spec.md
    /// §4.5/§9 — a generic KV store may widen integers to floating-point
    /// across a serialize round trip.
    async fn read_number(&self, name: &str) -> Option<f64> {
        match self.store.get(&self.key(name)).await {
            Ok(Some(Value::Number(n))) => n.as_f64(),
            Ok(Some(_)) | Ok(None) => None,
            Err(err) => {
                warn!(key = name, error = %err, "state read failed, defaulting");
                None
            }
        }
    }

    async fn write(&self, name: &str, value: Value) {
        if let Err(err) = self.store.set(&self.key(name), value).await {
            warn!(key = name, error = %err, "state write failed, dropping");
        }
    }
}

/// In-memory reference store, mirroring the teacher's `NoSessionManager`
/// in spirit (a store that works with no external backing) but actually
/// retaining values, so unit tests can observe writes.
#[derive(Default)]
pub struct InMemoryStateStore {
    data: Mutex<HashMap<String, Value>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StateError> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StateError> {
        self.data.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

/// Single-JSON-file reference store, mirroring the teacher's
/// `FileSessionManager` (tokio::fs-based JSON persistence).
pub struct FileStateStore {
    path: PathBuf,
    cache: tokio::sync::Mutex<Option<HashMap<String, Value>>>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: tokio::sync::Mutex::new(None),
        }
    }

    async fn load_all(&self) -> HashMap<String, Value> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => HashMap::new(),
        }
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StateError> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.load_all().await);
        }
        Ok(cache.as_ref().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StateError> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.load_all().await);
        }
        let map = cache.as_mut().unwrap();
        map.insert(key.to_string(), value);

        let serialized =
            serde_json::to_vec_pretty(map).map_err(|e| StateError::Io(e.to_string()))?;
        tokio::fs::write(&self.path, serialized)
            .await
            .map_err(|e| StateError::Io(e.to_string()))
    }
}

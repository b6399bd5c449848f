/// Failure from the caller-supplied summarization LLM adapter.
///
/// Every variant is recovered locally by `summarizer::summarize` — a
/// fallback mechanical summary is produced instead. Callers of this crate
/// never see this type unless they call the adapter directly.
#[derive(Debug, thiserror::Error)]
pub enum SummarizerError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("request cancelled")]
    Cancelled,
    #[error("empty response")]
    Empty,
}

/// Failure from the caller-supplied session state store.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("{0}")]
    Io(String),
}

//! The summarizer's single external capability: an LLM adapter.
//!
//! Modeled on the teacher's `InferenceProvider` trait, but narrowed to the
//! one operation the summarizer needs and shaped around a fragment stream
//! per spec.md §6, rather than the teacher's single-shot
//! `InferenceRequest`/`InferenceResponse` exchange. No concrete
//! HTTP-calling implementation ships here — per spec.md §1 the LLM client
//! is an external collaborator, consumed only through this interface.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SummarizerError;
use crate::types::{ConversationRequest, ResponseFragment};

/// A caller-supplied LLM used only for producing summaries.
///
/// `generate` returns the full, already-collected sequence of fragments
/// for the request. A real streaming implementation may buffer internally
/// and flush fragments as they arrive; this crate only ever looks at the
/// final non-partial fragment's text, per spec.md §6's "streaming partials
/// MUST be ignored for calibration" rule.
#[async_trait]
pub trait SummarizerProvider: Send + Sync {
    async fn generate(
        &self,
        request: &ConversationRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResponseFragment>, SummarizerError>;
}

/// Concatenate the text of every non-partial fragment, mirroring how a
/// real streaming client would assemble the final message.
pub fn final_text(fragments: &[ResponseFragment]) -> Option<String> {
    let text: String = fragments
        .iter()
        .filter(|f| !f.partial)
        .filter_map(|f| f.text.as_deref())
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Test/demo double for [`SummarizerProvider`]. Returns a fixed string,
    /// an error, or an empty response, controlled by its construction.
    pub struct MockSummarizerProvider {
        response: Option<String>,
        fail: AtomicBool,
    }

    impl MockSummarizerProvider {
        pub fn returning(text: impl Into<String>) -> Self {
            Self {
                response: Some(text.into()),
                fail: AtomicBool::new(false),
            }
        }

        pub fn failing() -> Self {
            Self {
                response: None,
                fail: AtomicBool::new(true),
            }
        }

        pub fn empty() -> Self {
            Self {
                response: Some(String::new()),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl SummarizerProvider for MockSummarizerProvider {
        async fn generate(
            &self,
            _request: &ConversationRequest,
            cancel: &CancellationToken,
        ) -> Result<Vec<ResponseFragment>, SummarizerError> {
            if cancel.is_cancelled() {
                return Err(SummarizerError::Cancelled);
            }
            if self.fail.load(Ordering::Relaxed) {
                return Err(SummarizerError::Request("mock failure".into()));
            }
            let text = self.response.clone().unwrap_or_default();
            Ok(vec![ResponseFragment {
                text: Some(text),
                partial: false,
                usage: None,
            }])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_text_skips_partials() {
        let fragments = vec![
            ResponseFragment {
                text: Some("partial".into()),
                partial: true,
                usage: None,
            },
            ResponseFragment {
                text: Some("final".into()),
                partial: false,
                usage: None,
            },
        ];
        assert_eq!(final_text(&fragments).as_deref(), Some("final"));
    }

    #[test]
    fn final_text_none_when_all_empty() {
        assert_eq!(final_text(&[]), None);
    }
}

//! Summarizer service client for CommentKeeper.
//!
//! [`Summarizer`] is the seam the reconciliation engine depends on; the
//! production implementation is [`HttpSummarizer`], an OpenAI-style
//! chat-completions client. Mocks for engine tests live in [`mock`].
//!
//! Contract: a call may fail (network, auth, rate limit); callers treat the
//! item as skipped and move on — no retry within a pass, no pass abort.

mod http;
pub mod mock;

use async_trait::async_trait;

use commentkeeper_shared::Result;

pub use http::HttpSummarizer;

/// Produces a short natural-language synopsis of raw post text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `text` into bounded plain prose (no markup).
    async fn summarize(&self, text: &str) -> Result<String>;
}

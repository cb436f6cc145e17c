//! Summarizer test doubles.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use commentkeeper_shared::{CommentKeeperError, Result};

use crate::Summarizer;

/// Always returns the same canned summary. Counts calls so tests can assert
/// how many summarizations a pass actually performed.
pub struct StaticSummarizer {
    summary: String,
    calls: AtomicUsize,
}

impl StaticSummarizer {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of summarize calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for StaticSummarizer {
    async fn summarize(&self, _text: &str) -> Result<String> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.summary.clone())
    }
}

/// Always fails, for exercising degrade-to-skip paths.
pub struct FailingSummarizer;

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _text: &str) -> Result<String> {
        Err(CommentKeeperError::Summarization(
            "mock summarizer failure".into(),
        ))
    }
}

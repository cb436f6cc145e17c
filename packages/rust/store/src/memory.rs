//! In-memory [`AnnotationStore`] for tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use commentkeeper_shared::{Annotation, CommentKeeperError, Result};

use crate::AnnotationStore;

/// Mutex-backed store double. Supports write-failure injection so engine
/// tests can exercise the degrade-to-skip paths.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Annotation>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `records`.
    pub fn with_records(records: Vec<Annotation>) -> Self {
        Self {
            records: Mutex::new(records),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent insert/update/delete fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all records, bot-authored or not.
    pub async fn all_records(&self) -> Vec<Annotation> {
        self.records.lock().await.clone()
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CommentKeeperError::Storage("injected write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AnnotationStore for MemoryStore {
    async fn bot_annotations(&self, author_tag: &str) -> Result<Vec<Annotation>> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .filter(|a| a.is_bot_authored(author_tag))
            .cloned()
            .collect())
    }

    async fn count_at_path(&self, path: &str, author_tag: &str) -> Result<u64> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .filter(|a| a.path == path && a.is_bot_authored(author_tag))
            .count() as u64)
    }

    async fn insert(&self, annotation: &Annotation) -> Result<()> {
        self.check_writes()?;
        self.records.lock().await.push(annotation.clone());
        Ok(())
    }

    async fn update_body(
        &self,
        path: &str,
        author_tag: &str,
        body_html: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check_writes()?;
        let mut records = self.records.lock().await;
        for record in records
            .iter_mut()
            .filter(|a| a.path == path && a.is_bot_authored(author_tag))
        {
            record.body_html = body_html.to_string();
            record.updated_at = updated_at;
        }
        Ok(())
    }

    async fn delete(&self, record_id: &str) -> Result<()> {
        self.check_writes()?;
        self.records.lock().await.retain(|a| a.record_id != record_id);
        Ok(())
    }
}

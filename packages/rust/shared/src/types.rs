//! Core domain types for CommentKeeper.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CanonicalPath
// ---------------------------------------------------------------------------

/// The deterministic URL-shaped key joining content items to annotations.
///
/// Shape: `/{UTCyear}/{UTCmonth:02}/{UTCday:02}/{encodedSlug}/`. Two items
/// with the same publish date (UTC) and slug always yield the same path; the
/// path must be stable across runs or annotations become orphaned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalPath(pub String);

impl CanonicalPath {
    /// View the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CanonicalPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// ContentItem
// ---------------------------------------------------------------------------

/// One published unit of content (a blog post), as produced by the posts
/// loader for each build. Immutable for the duration of one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Stable item identifier (file stem of the source document).
    pub id: String,
    /// Display title.
    pub title: String,
    /// Explicit slug from front matter, if any. When absent the identity
    /// resolver falls back to the source file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Publish date; its UTC calendar date feeds the canonical path.
    pub publish_date: DateTime<Utc>,
    /// Last-modified timestamp (front-matter `updated`, falling back to
    /// `publish_date`).
    pub updated_at: DateTime<Utc>,
    /// Raw body text, fed to the summarizer.
    pub raw_text: String,
    /// Drafts are excluded from reconciliation.
    pub is_draft: bool,
    /// Path of the source document on disk.
    pub source_path: PathBuf,
}

// ---------------------------------------------------------------------------
// Annotation
// ---------------------------------------------------------------------------

/// A stored comment-like record attributed to an automated author, attached
/// to a content item via its canonical path.
///
/// Owned exclusively by the annotation store; the engine only reads and
/// writes through the store adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    /// Stored record identifier. Deletions address this, never the path.
    pub record_id: String,
    /// Canonical path of the content item this annotation belongs to.
    pub path: String,
    /// Absolute URL of the content item (site base + path).
    pub href: String,
    /// Author display name; identifies bot-authored annotations.
    pub author_tag: String,
    /// Bot account identifier.
    pub author_uid: String,
    /// Bot homepage link.
    pub author_link: String,
    /// Bot user-agent string.
    pub author_user_agent: String,
    /// Annotation body, a single paragraph of HTML.
    pub body_html: String,
    /// When the record was first created.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
    /// Root-level annotations are direct replies to the item, not to another
    /// annotation.
    pub is_root_level: bool,
    /// Spam-flagged records are never treated as bot-authored.
    pub is_spam: bool,
}

impl Annotation {
    /// Generate a fresh record identifier (UUID v7, time-sortable).
    pub fn new_record_id() -> String {
        Uuid::now_v7().to_string()
    }

    /// Whether this record counts as bot-authored for the given bot name.
    pub fn is_bot_authored(&self, bot_name: &str) -> bool {
        self.is_root_level && self.author_tag == bot_name && !self.is_spam
    }
}

// ---------------------------------------------------------------------------
// ReconcileMode
// ---------------------------------------------------------------------------

/// Which build-lifecycle variant a reconciliation pass runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcileMode {
    /// Post-build hook: create-or-skip only. No updates, no sweep.
    PostBuild,
    /// Pre-build hook: full create/update/delete policy. Canonical behavior.
    #[default]
    PreBuild,
}

// ---------------------------------------------------------------------------
// PassSummary
// ---------------------------------------------------------------------------

/// Counters accumulated over one reconciliation pass.
///
/// Observability only; nothing downstream branches on these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassSummary {
    /// Non-draft items seen.
    pub total: usize,
    /// Items that got a new annotation.
    pub created: usize,
    /// Items whose annotation was regenerated.
    pub updated: usize,
    /// Items skipped (up to date, debounced, or failed locally).
    pub skipped: usize,
    /// Orphaned annotations removed by the sweep.
    pub deleted: usize,
    /// Wall-clock duration of the pass in milliseconds.
    pub elapsed_ms: u64,
}

//! Reconciliation engine: per-item decision policy and orphan sweep.
//!
//! Given the full current set of content items and the full current set of
//! bot-authored annotations, computes the minimal create/update/delete work
//! and applies it through the store adapter and summarizer. Item failures
//! degrade to Skip; only a store connection failure aborts a pass.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use url::Url;

use commentkeeper_posts as posts;
use commentkeeper_shared::{
    Annotation, BotConfig, CanonicalPath, ContentItem, PassSummary, Result,
};
use commentkeeper_store::AnnotationStore;
use commentkeeper_summarizer::Summarizer;

use crate::identity;

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Why an item was left alone this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not modified since the last annotation.
    UpToDate,
    /// Timestamps differ, but by no more than the debounce threshold.
    Debounced,
    /// The summarizer failed for this item.
    SummarizationFailed,
    /// A store operation or excerpt write failed for the item.
    PersistenceFailed,
    /// The item lacks the metadata needed to derive its path.
    MissingMetadata,
}

/// Transient per-(item | orphan path) reconciliation decision. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Create,
    Update,
    Skip(SkipReason),
    /// Orphan sweep removal, addressed by stored record id — never by path,
    /// so a same-path annotation recreated mid-run is not collateral.
    Delete { record_id: String },
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Skip(reason) => write!(f, "skip ({reason:?})"),
            Self::Delete { record_id } => write!(f, "delete ({record_id})"),
        }
    }
}

pub use commentkeeper_shared::ReconcileMode;

/// Decide what to do with one item given its existing annotation, if any.
///
/// Pure function over timestamps; sub-threshold drift between the item's
/// `updated_at` and the annotation's is treated as noise, not a real edit.
pub fn decide(
    item_updated: DateTime<Utc>,
    existing: Option<&Annotation>,
    threshold: Duration,
) -> Decision {
    let Some(existing) = existing else {
        return Decision::Create;
    };

    if item_updated <= existing.updated_at {
        return Decision::Skip(SkipReason::UpToDate);
    }

    let delta = (item_updated - existing.updated_at)
        .to_std()
        .unwrap_or(Duration::ZERO);
    if delta <= threshold {
        Decision::Skip(SkipReason::Debounced)
    } else {
        Decision::Update
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// One-pass reconciliation engine.
///
/// Borrows its collaborators; owns nothing but policy. Built fresh for every
/// pass — the only state shared across items is the read-only annotation
/// index built once at the start.
pub struct Engine<'a> {
    store: &'a dyn AnnotationStore,
    summarizer: &'a dyn Summarizer,
    bot: &'a BotConfig,
    base_url: &'a Url,
    threshold: Duration,
    mode: ReconcileMode,
}

impl<'a> Engine<'a> {
    pub fn new(
        store: &'a dyn AnnotationStore,
        summarizer: &'a dyn Summarizer,
        bot: &'a BotConfig,
        base_url: &'a Url,
        threshold: Duration,
        mode: ReconcileMode,
    ) -> Self {
        Self {
            store,
            summarizer,
            bot,
            base_url,
            threshold,
            mode,
        }
    }

    /// Compute the decision list without applying anything (dry run).
    ///
    /// Create/Update here mean "would summarize and write"; the degrade-to-
    /// skip rules only exist at apply time.
    pub async fn plan(&self, items: &[ContentItem]) -> Result<Vec<(CanonicalPath, Decision)>> {
        let snapshot = self.store.bot_annotations(&self.bot.name).await?;
        let by_path = index_by_path(&snapshot);

        let mut decisions = Vec::new();
        let mut current_paths = HashSet::new();

        for item in items.iter().filter(|i| !i.is_draft) {
            let path = match identity::item_path(item) {
                Ok(p) => p,
                Err(e) => {
                    warn!(item = %item.title, error = %e, "cannot derive canonical path");
                    continue;
                }
            };
            let decision = match self.mode {
                ReconcileMode::PostBuild => self.post_build_decision(item, &path).await,
                ReconcileMode::PreBuild => {
                    decide(item.updated_at, by_path.get(path.as_str()).copied(), self.threshold)
                }
            };
            let _ = current_paths.insert(path.as_str().to_string());
            decisions.push((path, decision));
        }

        if self.mode == ReconcileMode::PreBuild {
            for ann in &snapshot {
                if !current_paths.contains(&ann.path) {
                    decisions.push((
                        CanonicalPath(ann.path.clone()),
                        Decision::Delete {
                            record_id: ann.record_id.clone(),
                        },
                    ));
                }
            }
        }

        Ok(decisions)
    }

    /// Run the full pass: decide and apply per item, then sweep orphans.
    #[instrument(skip_all, fields(items = items.len(), mode = ?self.mode))]
    pub async fn run(&self, items: &[ContentItem]) -> Result<PassSummary> {
        let start = std::time::Instant::now();

        // Pre-run snapshot, indexed once. Read-only for the whole pass.
        let snapshot = self.store.bot_annotations(&self.bot.name).await?;
        let by_path = index_by_path(&snapshot);

        info!(
            items = items.len(),
            annotations = snapshot.len(),
            "starting reconciliation pass"
        );

        let mut summary = PassSummary::default();
        let mut current_paths: HashSet<String> = HashSet::new();

        for item in items.iter().filter(|i| !i.is_draft) {
            summary.total += 1;

            let path = match identity::item_path(item) {
                Ok(p) => p,
                Err(e) => {
                    warn!(item = %item.title, id = %item.id, error = %e, "skipping item");
                    summary.skipped += 1;
                    continue;
                }
            };
            let _ = current_paths.insert(path.as_str().to_string());

            let decision = match self.mode {
                ReconcileMode::PostBuild => self.post_build_decision(item, &path).await,
                ReconcileMode::PreBuild => {
                    decide(item.updated_at, by_path.get(path.as_str()).copied(), self.threshold)
                }
            };

            match decision {
                Decision::Skip(reason) => {
                    debug!(item = %item.title, path = %path, ?reason, "skipping");
                    summary.skipped += 1;
                }
                Decision::Create => match self.apply_create(item, &path).await {
                    Applied::Done => summary.created += 1,
                    Applied::Skipped => summary.skipped += 1,
                },
                Decision::Update => match self.apply_update(item, &path).await {
                    Applied::Done => summary.updated += 1,
                    Applied::Skipped => summary.skipped += 1,
                },
                Decision::Delete { .. } => unreachable!("deletes only come from the sweep"),
            }
        }

        // Orphan sweep, strictly after all create/update decisions: prune
        // every bot annotation whose path has no live item.
        if self.mode == ReconcileMode::PreBuild {
            for ann in &snapshot {
                if current_paths.contains(&ann.path) {
                    continue;
                }
                match self.store.delete(&ann.record_id).await {
                    Ok(()) => {
                        info!(path = %ann.path, record_id = %ann.record_id, "orphan annotation deleted");
                        summary.deleted += 1;
                    }
                    Err(e) => {
                        warn!(path = %ann.path, record_id = %ann.record_id, error = %e, "orphan delete failed");
                    }
                }
            }
        }

        summary.elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            total = summary.total,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            deleted = summary.deleted,
            elapsed_ms = summary.elapsed_ms,
            "reconciliation pass complete"
        );
        Ok(summary)
    }

    /// Post-build policy: one live count query per item, creating only when
    /// the bot has nothing at the path yet. Lookup failure skips the item.
    async fn post_build_decision(&self, item: &ContentItem, path: &CanonicalPath) -> Decision {
        match self.store.count_at_path(path.as_str(), &self.bot.name).await {
            Ok(0) => Decision::Create,
            Ok(_) => Decision::Skip(SkipReason::UpToDate),
            Err(e) => {
                warn!(item = %item.title, id = %item.id, error = %e, "annotation lookup failed, skipping");
                Decision::Skip(SkipReason::PersistenceFailed)
            }
        }
    }

    /// Summarize and create the annotation + excerpt pair for a new item.
    async fn apply_create(&self, item: &ContentItem, path: &CanonicalPath) -> Applied {
        let Some(body_html) = self.summarize(item).await else {
            return Applied::Skipped;
        };

        let now = Utc::now();
        let annotation = Annotation {
            record_id: Annotation::new_record_id(),
            path: path.as_str().to_string(),
            href: identity::href_for(self.base_url, path),
            author_tag: self.bot.name.clone(),
            author_uid: self.bot.uid.clone(),
            author_link: self.bot.link.clone(),
            author_user_agent: self.bot.user_agent.clone(),
            body_html,
            created_at: now,
            updated_at: now,
            is_root_level: true,
            is_spam: false,
        };

        // The two writes target disjoint resources; issue both, surface both.
        let (ann_result, excerpt_result) = tokio::join!(
            self.store.insert(&annotation),
            async { posts::write_excerpt(&item.source_path, strip_paragraph(&annotation.body_html)) },
        );
        self.settle(item, ann_result, excerpt_result, "create")
    }

    /// Summarize and rewrite the annotation + excerpt pair for an edited item.
    async fn apply_update(&self, item: &ContentItem, path: &CanonicalPath) -> Applied {
        let Some(body_html) = self.summarize(item).await else {
            return Applied::Skipped;
        };

        let now = Utc::now();
        let (ann_result, excerpt_result) = tokio::join!(
            self.store
                .update_body(path.as_str(), &self.bot.name, &body_html, now),
            async { posts::write_excerpt(&item.source_path, strip_paragraph(&body_html)) },
        );
        self.settle(item, ann_result, excerpt_result, "update")
    }

    /// Summarize one item, wrapping the prose in its paragraph container.
    /// Failure logs and yields `None`; the caller degrades to Skip.
    async fn summarize(&self, item: &ContentItem) -> Option<String> {
        match self.summarizer.summarize(&item.raw_text).await {
            Ok(summary) => Some(format!("<p>{summary}</p>")),
            Err(e) => {
                warn!(item = %item.title, id = %item.id, error = %e, "summarization failed, skipping");
                None
            }
        }
    }

    /// Combine the paired write results. Partial application is accepted:
    /// neither write rolls the other back, but both failures are logged and
    /// either one downgrades the item to skipped.
    fn settle(
        &self,
        item: &ContentItem,
        ann_result: Result<()>,
        excerpt_result: Result<()>,
        action: &str,
    ) -> Applied {
        let mut failed = false;
        if let Err(e) = ann_result {
            warn!(item = %item.title, id = %item.id, error = %e, "annotation {action} failed");
            failed = true;
        }
        if let Err(e) = excerpt_result {
            warn!(item = %item.title, id = %item.id, error = %e, "excerpt write failed");
            failed = true;
        }
        if failed {
            Applied::Skipped
        } else {
            debug!(item = %item.title, "{action} applied");
            Applied::Done
        }
    }
}

/// Outcome of applying one Create/Update decision.
enum Applied {
    Done,
    Skipped,
}

/// Index annotations by canonical path. Paths are unique keys per bot.
fn index_by_path(annotations: &[Annotation]) -> HashMap<&str, &Annotation> {
    annotations.iter().map(|a| (a.path.as_str(), a)).collect()
}

/// The excerpt field stores the bare prose, not the HTML container.
fn strip_paragraph(body_html: &str) -> &str {
    body_html
        .strip_prefix("<p>")
        .and_then(|s| s.strip_suffix("</p>"))
        .unwrap_or(body_html)
}

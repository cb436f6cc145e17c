//! Pass orchestration: load items, open the store, reconcile, release.
//!
//! The store connection is scoped to a single pass. It is opened after the
//! items are loaded and dropped on every exit path, success or failure, so a
//! crashed pass never leaves a connection behind.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, instrument};
use url::Url;

use commentkeeper_posts as posts;
use commentkeeper_shared::{
    AppConfig, BotConfig, CanonicalPath, CommentKeeperError, ContentItem, PassSummary, Result,
};
use commentkeeper_store::{AnnotationStore, LibsqlStore};
use commentkeeper_summarizer::{HttpSummarizer, Summarizer};

use crate::engine::{Decision, Engine, ReconcileMode};

/// Everything a reconciliation pass needs besides the item set.
///
/// Collaborators are borrowed so tests can hand in doubles; [`run_pass`]
/// builds the production wiring from config.
pub struct PassContext<'a> {
    pub store: &'a dyn AnnotationStore,
    pub summarizer: &'a dyn Summarizer,
    pub bot: &'a BotConfig,
    pub base_url: &'a Url,
    pub update_threshold: Duration,
    pub mode: ReconcileMode,
}

/// Reconcile `items` against the store in `ctx`. The library entry point.
pub async fn reconcile(ctx: &PassContext<'_>, items: &[ContentItem]) -> Result<PassSummary> {
    Engine::new(
        ctx.store,
        ctx.summarizer,
        ctx.bot,
        ctx.base_url,
        ctx.update_threshold,
        ctx.mode,
    )
    .run(items)
    .await
}

/// Compute the decision list for `items` without applying anything.
pub async fn plan(
    ctx: &PassContext<'_>,
    items: &[ContentItem],
) -> Result<Vec<(CanonicalPath, Decision)>> {
    Engine::new(
        ctx.store,
        ctx.summarizer,
        ctx.bot,
        ctx.base_url,
        ctx.update_threshold,
        ctx.mode,
    )
    .plan(items)
    .await
}

/// Run one full production pass from config: load posts, connect the store,
/// reconcile, release.
#[instrument(skip_all, fields(mode = ?mode))]
pub async fn run_pass(
    config: &AppConfig,
    posts_dir: &Path,
    mode: ReconcileMode,
) -> Result<PassSummary> {
    let base_url = parse_base_url(&config.site.base_url)?;
    let summarizer = HttpSummarizer::new(&config.summarizer)?;

    let items = posts::load_items(posts_dir)?;
    info!(items = items.len(), dir = %posts_dir.display(), "content items loaded");

    // Connection failure here is the one pass-fatal error.
    let store = LibsqlStore::connect(Path::new(&config.store.db_path)).await?;

    let ctx = PassContext {
        store: &store,
        summarizer: &summarizer,
        bot: &config.bot,
        base_url: &base_url,
        update_threshold: config.reconcile.update_threshold(),
        mode,
    };
    let result = reconcile(&ctx, &items).await;

    drop(store);
    debug!("store connection released");

    result
}

/// Run a dry pass from config: same loading and store lifecycle as
/// [`run_pass`], but only decisions come back. No summarizer is built —
/// planning never calls it.
#[instrument(skip_all, fields(mode = ?mode))]
pub async fn plan_pass(
    config: &AppConfig,
    posts_dir: &Path,
    mode: ReconcileMode,
) -> Result<Vec<(CanonicalPath, Decision)>> {
    let base_url = parse_base_url(&config.site.base_url)?;

    let items = posts::load_items(posts_dir)?;
    info!(items = items.len(), dir = %posts_dir.display(), "content items loaded");

    let store = LibsqlStore::connect(Path::new(&config.store.db_path)).await?;

    let ctx = PassContext {
        store: &store,
        summarizer: &NeverSummarizer,
        bot: &config.bot,
        base_url: &base_url,
        update_threshold: config.reconcile.update_threshold(),
        mode,
    };
    let result = plan(&ctx, &items).await;

    drop(store);
    debug!("store connection released");

    result
}

fn parse_base_url(raw: &str) -> Result<Url> {
    Url::parse(raw)
        .map_err(|e| CommentKeeperError::config(format!("invalid site.base_url '{raw}': {e}")))
}

/// Placeholder for planning contexts. Planning must never summarize; if it
/// does, that is a bug worth failing loudly on.
struct NeverSummarizer;

#[async_trait::async_trait]
impl Summarizer for NeverSummarizer {
    async fn summarize(&self, _text: &str) -> Result<String> {
        Err(CommentKeeperError::Summarization(
            "summarizer invoked during planning".into(),
        ))
    }
}

//! Loads content items from a posts directory.
//!
//! Walks the directory recursively for Markdown sources, parses each file's
//! front matter, and produces the [`ContentItem`] set for one reconciliation
//! pass. Malformed files are logged and skipped — one bad post must not take
//! down the whole pass.

use std::path::Path;

use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use commentkeeper_shared::{CommentKeeperError, ContentItem, Result};

use crate::frontmatter;

/// Load all content items under `posts_dir`, drafts excluded.
///
/// Returns items sorted by source path for deterministic pass ordering.
#[instrument(skip_all, fields(dir = %posts_dir.display()))]
pub fn load_items(posts_dir: &Path) -> Result<Vec<ContentItem>> {
    if !posts_dir.is_dir() {
        return Err(CommentKeeperError::validation(format!(
            "posts directory '{}' does not exist",
            posts_dir.display()
        )));
    }

    let mut items = Vec::new();
    let mut drafts = 0usize;

    for entry in WalkDir::new(posts_dir).follow_links(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "cannot read directory entry, skipping");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }

        match load_item(path) {
            Ok(Some(item)) => items.push(item),
            Ok(None) => drafts += 1,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable post");
            }
        }
    }

    items.sort_by(|a, b| a.source_path.cmp(&b.source_path));
    debug!(count = items.len(), drafts, "loaded content items");
    Ok(items)
}

/// Load a single post file. Returns `None` for drafts.
fn load_item(path: &Path) -> Result<Option<ContentItem>> {
    let content =
        std::fs::read_to_string(path).map_err(|e| CommentKeeperError::io(path, e))?;
    let doc = frontmatter::parse(&content)?;

    if doc.front.draft {
        return Ok(None);
    }

    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(String::from)
        .ok_or_else(|| {
            CommentKeeperError::validation(format!(
                "cannot derive an id from file name '{}'",
                path.display()
            ))
        })?;

    let publish_date = doc.front.date.ok_or_else(|| {
        CommentKeeperError::missing_metadata(&id, "front matter has no date")
    })?;

    // Posts that were never edited carry no `updated` field.
    let updated_at = doc.front.updated.unwrap_or(publish_date);

    let title = doc.front.title.clone().unwrap_or_else(|| id.clone());

    Ok(Some(ContentItem {
        id,
        title,
        slug: doc.front.slug,
        publish_date,
        updated_at,
        raw_text: doc.body,
        is_draft: false,
        source_path: path.to_path_buf(),
    }))
}

/// Rewrite the `excerpt` front-matter field of the post at `path`.
///
/// The rest of the document is preserved byte-for-byte.
pub fn write_excerpt(path: &Path, summary: &str) -> Result<()> {
    let content =
        std::fs::read_to_string(path).map_err(|e| CommentKeeperError::io(path, e))?;
    let rewritten = frontmatter::with_excerpt(&content, summary)?;
    std::fs::write(path, rewritten).map_err(|e| CommentKeeperError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_posts_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ck_posts_{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn write_post(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).expect("write post");
    }

    #[test]
    fn loads_posts_and_excludes_drafts() {
        let dir = temp_posts_dir();
        write_post(
            &dir,
            "hello-world.md",
            "---\ntitle: Hello World\ndate: 2024-03-05 08:00:00\n---\nBody text.\n",
        );
        write_post(
            &dir,
            "wip.md",
            "---\ntitle: WIP\ndate: 2024-03-06\ndraft: true\n---\nNot ready.\n",
        );
        write_post(&dir, "notes.txt", "not a post");

        let items = load_items(&dir).expect("load");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "hello-world");
        assert_eq!(items[0].title, "Hello World");
        assert!(!items[0].is_draft);
        assert_eq!(items[0].raw_text, "Body text.\n");
    }

    #[test]
    fn missing_date_skips_file_not_pass() {
        let dir = temp_posts_dir();
        write_post(&dir, "ok.md", "---\ntitle: Ok\ndate: 2024-01-01\n---\nbody\n");
        write_post(&dir, "bad.md", "---\ntitle: No Date\n---\nbody\n");

        let items = load_items(&dir).expect("load");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "ok");
    }

    #[test]
    fn updated_falls_back_to_publish_date() {
        let dir = temp_posts_dir();
        write_post(&dir, "p.md", "---\ntitle: P\ndate: 2024-02-01 09:00:00\n---\nbody\n");

        let items = load_items(&dir).expect("load");
        assert_eq!(items[0].updated_at, items[0].publish_date);
    }

    #[test]
    fn missing_posts_dir_is_an_error() {
        let dir = temp_posts_dir().join("nope");
        assert!(load_items(&dir).is_err());
    }

    #[test]
    fn write_excerpt_roundtrip() {
        let dir = temp_posts_dir();
        let original = "---\ntitle: P\ndate: 2024-02-01\n---\nbody line\n";
        write_post(&dir, "p.md", original);

        write_excerpt(&dir.join("p.md"), "A summary.").expect("write excerpt");

        let content = std::fs::read_to_string(dir.join("p.md")).expect("read back");
        assert!(content.contains("excerpt: \"A summary.\""));
        assert!(content.ends_with("body line\n"));
    }
}

//! Annotation store adapter for CommentKeeper.
//!
//! The reconciliation engine talks to the store through the
//! [`AnnotationStore`] trait: query bot-authored records, insert, update by
//! path, delete by record id. [`LibsqlStore`] is the production adapter over
//! a libSQL database; [`MemoryStore`] backs engine tests.
//!
//! Malformed rows are rejected at this boundary with a `Storage` error —
//! loose or missing fields never reach the engine.

mod memory;
mod migrations;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};

use commentkeeper_shared::{Annotation, CommentKeeperError, Result};

pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// AnnotationStore trait
// ---------------------------------------------------------------------------

/// Query and mutation surface over annotation records.
///
/// Records are keyed by canonical path for lookups and by record id for
/// deletion. The store owns the records; callers only mediate transitions.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// All bot-authored annotations for `author_tag`: root-level, not spam.
    async fn bot_annotations(&self, author_tag: &str) -> Result<Vec<Annotation>>;

    /// Count bot-authored annotations at one canonical path.
    async fn count_at_path(&self, path: &str, author_tag: &str) -> Result<u64>;

    /// Insert a new annotation record.
    async fn insert(&self, annotation: &Annotation) -> Result<()>;

    /// Update the body and timestamp of the bot annotation at `path`.
    async fn update_body(
        &self,
        path: &str,
        author_tag: &str,
        body_html: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete an annotation by its stored record id.
    async fn delete(&self, record_id: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// LibsqlStore
// ---------------------------------------------------------------------------

/// Production annotation store over a libSQL database.
pub struct LibsqlStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl LibsqlStore {
    /// Open or create the annotation database at `path`.
    ///
    /// An unreachable database is a [`CommentKeeperError::Connection`] —
    /// pass-fatal by contract. Schema migrations run on every open.
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CommentKeeperError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CommentKeeperError::Connection(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| CommentKeeperError::Connection(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    CommentKeeperError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }
}

const SELECT_COLUMNS: &str = "id, path, href, author_tag, author_uid, author_link, \
     author_user_agent, body_html, created_at, updated_at, root_level, is_spam";

#[async_trait]
impl AnnotationStore for LibsqlStore {
    async fn bot_annotations(&self, author_tag: &str) -> Result<Vec<Annotation>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM annotations
                     WHERE author_tag = ?1 AND root_level = 1 AND is_spam = 0
                     ORDER BY path"
                ),
                params![author_tag],
            )
            .await
            .map_err(|e| CommentKeeperError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_annotation(&row)?);
        }
        Ok(results)
    }

    async fn count_at_path(&self, path: &str, author_tag: &str) -> Result<u64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM annotations
                 WHERE path = ?1 AND author_tag = ?2 AND root_level = 1 AND is_spam = 0",
                params![path, author_tag],
            )
            .await
            .map_err(|e| CommentKeeperError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<u64>(0)
                .map_err(|e| CommentKeeperError::Storage(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(CommentKeeperError::Storage(e.to_string())),
        }
    }

    async fn insert(&self, annotation: &Annotation) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO annotations
                   (id, path, href, author_tag, author_uid, author_link,
                    author_user_agent, body_html, created_at, updated_at,
                    root_level, is_spam)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    annotation.record_id.as_str(),
                    annotation.path.as_str(),
                    annotation.href.as_str(),
                    annotation.author_tag.as_str(),
                    annotation.author_uid.as_str(),
                    annotation.author_link.as_str(),
                    annotation.author_user_agent.as_str(),
                    annotation.body_html.as_str(),
                    annotation.created_at.to_rfc3339(),
                    annotation.updated_at.to_rfc3339(),
                    annotation.is_root_level as i64,
                    annotation.is_spam as i64,
                ],
            )
            .await
            .map_err(|e| CommentKeeperError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn update_body(
        &self,
        path: &str,
        author_tag: &str,
        body_html: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn
            .execute(
                "UPDATE annotations SET body_html = ?1, updated_at = ?2
                 WHERE path = ?3 AND author_tag = ?4 AND root_level = 1 AND is_spam = 0",
                params![
                    body_html,
                    updated_at.to_rfc3339(),
                    path,
                    author_tag
                ],
            )
            .await
            .map_err(|e| CommentKeeperError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, record_id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM annotations WHERE id = ?1", params![record_id])
            .await
            .map_err(|e| CommentKeeperError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// Convert a database row to an [`Annotation`], rejecting malformed rows.
fn row_to_annotation(row: &libsql::Row) -> Result<Annotation> {
    let get_text = |idx: i32| -> Result<String> {
        row.get::<String>(idx)
            .map_err(|e| CommentKeeperError::Storage(format!("column {idx}: {e}")))
    };
    let get_date = |idx: i32| -> Result<DateTime<Utc>> {
        let s = get_text(idx)?;
        chrono::DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| CommentKeeperError::Storage(format!("invalid date '{s}': {e}")))
    };

    Ok(Annotation {
        record_id: get_text(0)?,
        path: get_text(1)?,
        href: get_text(2)?,
        author_tag: get_text(3)?,
        author_uid: get_text(4)?,
        author_link: get_text(5)?,
        author_user_agent: get_text(6)?,
        body_html: get_text(7)?,
        created_at: get_date(8)?,
        updated_at: get_date(9)?,
        is_root_level: row
            .get::<i64>(10)
            .map_err(|e| CommentKeeperError::Storage(e.to_string()))?
            != 0,
        is_spam: row
            .get::<i64>(11)
            .map_err(|e| CommentKeeperError::Storage(e.to_string()))?
            != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    /// Create a temp file store for testing.
    async fn test_store() -> LibsqlStore {
        let tmp = std::env::temp_dir().join(format!("ck_test_{}.db", Uuid::now_v7()));
        LibsqlStore::connect(&tmp).await.expect("open test db")
    }

    fn bot_annotation(path: &str) -> Annotation {
        Annotation {
            record_id: Annotation::new_record_id(),
            path: path.into(),
            href: format!("https://example.com{path}"),
            author_tag: "SummaryBot".into(),
            author_uid: "summary-bot".into(),
            author_link: "https://example.com/about".into(),
            author_user_agent: "CommentKeeper/0.1".into(),
            body_html: "<p>summary</p>".into(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(),
            is_root_level: true,
            is_spam: false,
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let store = test_store().await;
        assert_eq!(store.schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("ck_test_{}.db", Uuid::now_v7()));
        let s1 = LibsqlStore::connect(&tmp).await.expect("first open");
        drop(s1);
        let s2 = LibsqlStore::connect(&tmp).await.expect("second open");
        assert_eq!(s2.schema_version().await, 1);
    }

    #[tokio::test]
    async fn insert_and_query_roundtrip() {
        let store = test_store().await;
        let ann = bot_annotation("/2024/03/05/hello/");
        store.insert(&ann).await.expect("insert");

        let all = store.bot_annotations("SummaryBot").await.expect("query");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].record_id, ann.record_id);
        assert_eq!(all[0].path, "/2024/03/05/hello/");
        assert_eq!(all[0].updated_at, ann.updated_at);
        assert!(all[0].is_root_level);
        assert!(!all[0].is_spam);
    }

    #[tokio::test]
    async fn bot_filter_excludes_spam_and_replies() {
        let store = test_store().await;
        store.insert(&bot_annotation("/a/")).await.unwrap();

        let mut spam = bot_annotation("/b/");
        spam.is_spam = true;
        store.insert(&spam).await.unwrap();

        let mut reply = bot_annotation("/c/");
        reply.is_root_level = false;
        store.insert(&reply).await.unwrap();

        let mut human = bot_annotation("/d/");
        human.author_tag = "alice".into();
        store.insert(&human).await.unwrap();

        let bots = store.bot_annotations("SummaryBot").await.expect("query");
        assert_eq!(bots.len(), 1);
        assert_eq!(bots[0].path, "/a/");
    }

    #[tokio::test]
    async fn count_at_path() {
        let store = test_store().await;
        store.insert(&bot_annotation("/x/")).await.unwrap();

        assert_eq!(store.count_at_path("/x/", "SummaryBot").await.unwrap(), 1);
        assert_eq!(store.count_at_path("/y/", "SummaryBot").await.unwrap(), 0);
        assert_eq!(store.count_at_path("/x/", "OtherBot").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_body_touches_only_matching_path() {
        let store = test_store().await;
        store.insert(&bot_annotation("/a/")).await.unwrap();
        store.insert(&bot_annotation("/b/")).await.unwrap();

        let later = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        store
            .update_body("/a/", "SummaryBot", "<p>revised</p>", later)
            .await
            .expect("update");

        let all = store.bot_annotations("SummaryBot").await.unwrap();
        let a = all.iter().find(|x| x.path == "/a/").unwrap();
        let b = all.iter().find(|x| x.path == "/b/").unwrap();
        assert_eq!(a.body_html, "<p>revised</p>");
        assert_eq!(a.updated_at, later);
        assert_eq!(b.body_html, "<p>summary</p>");
    }

    #[tokio::test]
    async fn delete_by_record_id() {
        let store = test_store().await;
        let keep = bot_annotation("/keep/");
        let drop_me = bot_annotation("/drop/");
        store.insert(&keep).await.unwrap();
        store.insert(&drop_me).await.unwrap();

        store.delete(&drop_me.record_id).await.expect("delete");

        let all = store.bot_annotations("SummaryBot").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].record_id, keep.record_id);
    }
}

//! SQL migration definitions for the annotation database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed within a transaction.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: annotations",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Annotation records, keyed by canonical path + author
CREATE TABLE IF NOT EXISTS annotations (
    id                TEXT PRIMARY KEY,
    path              TEXT NOT NULL,
    href              TEXT NOT NULL,
    author_tag        TEXT NOT NULL,
    author_uid        TEXT NOT NULL,
    author_link       TEXT NOT NULL,
    author_user_agent TEXT NOT NULL,
    body_html         TEXT NOT NULL,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    root_level        INTEGER NOT NULL DEFAULT 1,
    is_spam           INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_annotations_path ON annotations(path, author_tag);
CREATE INDEX IF NOT EXISTS idx_annotations_author ON annotations(author_tag);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}

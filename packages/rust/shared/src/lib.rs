//! Shared types, error model, and configuration for CommentKeeper.
//!
//! This crate is the foundation depended on by all other CommentKeeper crates.
//! It provides:
//! - [`CommentKeeperError`] — the unified error type
//! - Domain types ([`ContentItem`], [`Annotation`], [`CanonicalPath`], [`PassSummary`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BotConfig, ReconcileConfig, SiteConfig, StoreConfig, SummarizerConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{CommentKeeperError, Result};
pub use types::{Annotation, CanonicalPath, ContentItem, PassSummary, ReconcileMode};

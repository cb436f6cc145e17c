//! Application configuration for CommentKeeper.
//!
//! User config lives at `~/.commentkeeper/commentkeeper.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CommentKeeperError, Result};
use crate::types::ReconcileMode;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "commentkeeper.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".commentkeeper";

// ---------------------------------------------------------------------------
// Config structs (matching commentkeeper.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Site settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Annotation store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Bot identity attached to every annotation.
    #[serde(default)]
    pub bot: BotConfig,

    /// Summarizer service settings.
    #[serde(default)]
    pub summarizer: SummarizerConfig,

    /// Reconciliation policy knobs.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Base URL of the published site, used to build annotation hrefs.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Directory holding post source files.
    #[serde(default = "default_posts_dir")]
    pub posts_dir: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            posts_dir: default_posts_dir(),
        }
    }
}

fn default_base_url() -> String {
    "https://example.com".into()
}
fn default_posts_dir() -> String {
    "./source/_posts".into()
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the annotation database.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "var/commentkeeper.db".into()
}

/// `[bot]` section — the identity stamped onto every annotation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Display name; also the filter for bot-authored records.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Account identifier.
    #[serde(default = "default_bot_uid")]
    pub uid: String,

    /// Homepage link.
    #[serde(default = "default_bot_link")]
    pub link: String,

    /// User-agent string.
    #[serde(default = "default_bot_user_agent")]
    pub user_agent: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            uid: default_bot_uid(),
            link: default_bot_link(),
            user_agent: default_bot_user_agent(),
        }
    }
}

fn default_bot_name() -> String {
    "SummaryBot".into()
}
fn default_bot_uid() -> String {
    "summary-bot".into()
}
fn default_bot_link() -> String {
    "https://example.com/about".into()
}
fn default_bot_user_agent() -> String {
    concat!("CommentKeeper/", env!("CARGO_PKG_VERSION")).into()
}

/// `[summarizer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Chat-completions endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model ID.
    #[serde(default = "default_model")]
    pub model: String,

    /// System prompt framing the summarization request.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Post body is truncated to this many characters before sending.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.deepseek.com/v1/chat/completions".into()
}
fn default_api_key_env() -> String {
    "DEEPSEEK_API_KEY".into()
}
fn default_model() -> String {
    "deepseek-chat".into()
}
fn default_system_prompt() -> String {
    "You are a blog reader who excels at reading and summarizing articles. \
     Provide a concise third-person summary of the post in at most 100 words."
        .into()
}
fn default_max_input_chars() -> usize {
    12_000
}

/// `[reconcile]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Minimum timestamp delta (ms) before a content edit is treated as a
    /// real change rather than noise.
    #[serde(default = "default_update_threshold_ms")]
    pub update_threshold_ms: u64,

    /// Lifecycle mode used when the CLI flag is not given: `pre-build`
    /// (full policy) or `post-build` (create-or-skip).
    #[serde(default)]
    pub mode: ReconcileMode,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            update_threshold_ms: default_update_threshold_ms(),
            mode: ReconcileMode::default(),
        }
    }
}

fn default_update_threshold_ms() -> u64 {
    60_000
}

impl ReconcileConfig {
    /// The debounce threshold as a [`Duration`].
    pub fn update_threshold(&self) -> Duration {
        Duration::from_millis(self.update_threshold_ms)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.commentkeeper/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CommentKeeperError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.commentkeeper/commentkeeper.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CommentKeeperError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CommentKeeperError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CommentKeeperError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CommentKeeperError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CommentKeeperError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the summarizer API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.summarizer.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(CommentKeeperError::config(format!(
            "summarizer API key not found. Set the {var_name} environment variable."
        ))),
    }
}

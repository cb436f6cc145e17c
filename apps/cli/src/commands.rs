//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use commentkeeper_core::{Decision, ReconcileMode, plan_pass, run_pass};
use commentkeeper_shared::{AppConfig, init_config, load_config, validate_api_key};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// CommentKeeper — reconcile posts with their summary annotations.
#[derive(Parser)]
#[command(
    name = "commentkeeper",
    version,
    about = "Keep bot-authored summary annotations in sync with published blog posts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Which lifecycle hook the pass runs as.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum Mode {
    /// Full create/update/delete policy, run before the site build.
    Pre,
    /// Create-or-skip only, run after the site build.
    Post,
}

impl From<Mode> for ReconcileMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Pre => ReconcileMode::PreBuild,
            Mode::Post => ReconcileMode::PostBuild,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a reconciliation pass over the posts directory.
    Run {
        /// Posts directory (defaults to site.posts_dir from config).
        #[arg(long)]
        posts_dir: Option<String>,

        /// Lifecycle mode: pre (full policy) or post (create-or-skip).
        /// Defaults to reconcile.mode from config.
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },

    /// Show what a pass would do without summarizing or writing anything.
    Plan {
        /// Posts directory (defaults to site.posts_dir from config).
        #[arg(long)]
        posts_dir: Option<String>,

        /// Lifecycle mode: pre (full policy) or post (create-or-skip).
        /// Defaults to reconcile.mode from config.
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "commentkeeper=info",
        1 => "commentkeeper=debug",
        _ => "commentkeeper=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run { posts_dir, mode } => cmd_run(posts_dir.as_deref(), mode).await,
        Command::Plan { posts_dir, mode } => cmd_plan(posts_dir.as_deref(), mode).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(posts_dir: Option<&str>, mode: Option<Mode>) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;

    let posts_dir = resolve_posts_dir(posts_dir, &config);
    ensure_posts_dir(&posts_dir)?;
    let mode = resolve_mode(mode, &config);

    info!(dir = %posts_dir.display(), ?mode, "starting reconciliation pass");

    let spinner = spinner("Reconciling annotations...");
    let result = run_pass(&config, &posts_dir, mode).await;
    spinner.finish_and_clear();

    let summary = result?;

    println!();
    println!("  Reconciliation pass complete!");
    println!("  Items:   {}", summary.total);
    println!("  Created: {}", summary.created);
    println!("  Updated: {}", summary.updated);
    println!("  Skipped: {}", summary.skipped);
    println!("  Deleted: {}", summary.deleted);
    println!("  Time:    {:.1}s", summary.elapsed_ms as f64 / 1000.0);
    println!();

    Ok(())
}

async fn cmd_plan(posts_dir: Option<&str>, mode: Option<Mode>) -> Result<()> {
    let config = load_config()?;

    let posts_dir = resolve_posts_dir(posts_dir, &config);
    ensure_posts_dir(&posts_dir)?;
    let mode = resolve_mode(mode, &config);

    info!(dir = %posts_dir.display(), ?mode, "planning reconciliation pass");

    let decisions = plan_pass(&config, &posts_dir, mode).await?;

    if decisions.is_empty() {
        println!("Nothing to do.");
        return Ok(());
    }

    let mut creates = 0usize;
    let mut updates = 0usize;
    let mut skips = 0usize;
    let mut deletes = 0usize;

    println!();
    for (path, decision) in &decisions {
        match decision {
            Decision::Create => creates += 1,
            Decision::Update => updates += 1,
            Decision::Skip(_) => skips += 1,
            Decision::Delete { .. } => deletes += 1,
        }
        println!("  {:<24} {path}", decision.to_string());
    }
    println!();
    println!("  {creates} to create, {updates} to update, {skips} up to date, {deletes} orphans to delete");
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_posts_dir(flag: Option<&str>, config: &AppConfig) -> PathBuf {
    PathBuf::from(flag.unwrap_or(&config.site.posts_dir))
}

fn resolve_mode(flag: Option<Mode>, config: &AppConfig) -> ReconcileMode {
    flag.map(ReconcileMode::from).unwrap_or(config.reconcile.mode)
}

fn ensure_posts_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(eyre!(
            "posts directory '{}' does not exist — pass --posts-dir or set site.posts_dir",
            dir.display()
        ));
    }
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(message.to_string());
    spinner
}

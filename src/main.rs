//! # Wiki Mirror CLI (`mirror`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mirror sync <SPACE>` | Fetch pages that are not archived yet |
//! | `mirror sync <SPACE> --full` | Refetch every page in the space |
//! | `mirror hierarchy <SPACE>` | Rewrite the space's hierarchy index only |
//! | `mirror status` | Summarize the local archive |
//!
//! The session credential is read from the environment variable named by
//! `remote.session_env` (default `MIRROR_SESSION`). Logs go to stderr and
//! honour `RUST_LOG`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use wiki_mirror::config;
use wiki_mirror::connector_confluence::ConfluenceClient;
use wiki_mirror::markup::HtmlToMarkdown;
use wiki_mirror::progress::ProgressMode;
use wiki_mirror::status;
use wiki_mirror::sync::{self, SyncContext, SyncMode, SyncOptions};

/// Mirror a wiki space into a local Markdown archive.
#[derive(Parser)]
#[command(
    name = "mirror",
    version,
    about = "Incrementally mirror a wiki space into local Markdown files"
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/mirror.toml")]
    config: PathBuf,

    /// Progress output on stderr. Defaults to `human` on a terminal.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch pages of a space that have no archived copy yet.
    ///
    /// Lists the space, rewrites its hierarchy index, then downloads each
    /// missing page in random order with a randomized pause between pages.
    Sync {
        /// Space key (e.g. `ARR`).
        space: String,

        /// Ignore the archive and refetch every page.
        #[arg(long)]
        full: bool,

        /// Report what would be fetched without fetching or writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Fetch at most this many pages in this run.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Rewrite the hierarchy index of a space without fetching pages.
    Hierarchy {
        /// Space key (e.g. `ARR`).
        space: String,
    },

    /// Show what is archived locally. Makes no remote calls.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Status => {
            status::print_status(&cfg)?;
        }
        Commands::Hierarchy { space } => {
            let ctx = build_context(cfg, cli.progress)?;
            let path = ctx.run_hierarchy(&space).await?;
            println!("hierarchy {}", space);
            println!("  written: {}", path.display());
            println!("ok");
        }
        Commands::Sync {
            space,
            full,
            dry_run,
            limit,
        } => {
            let ctx = build_context(cfg, cli.progress)?;
            let options = SyncOptions {
                mode: if full { SyncMode::Full } else { SyncMode::Delta },
                dry_run,
                limit,
            };
            let report = ctx.run_sync(&space, &options).await?;
            sync::print_report(&report);
        }
    }

    Ok(())
}

fn build_context(
    cfg: config::Config,
    progress: Option<ProgressMode>,
) -> anyhow::Result<SyncContext> {
    let client = ConfluenceClient::from_config(&cfg)?;
    let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
    Ok(
        SyncContext::new(cfg, Box::new(client), Box::new(HtmlToMarkdown))
            .with_progress(progress.reporter()),
    )
}

//! yepmem CLI - repository + AI-session knowledge base
//!
//! # Usage
//!
//! ```bash
//! # Index the repository and new checkpoint sessions
//! yepmem ingest
//!
//! # Ask the knowledge base
//! yepmem search "what changed in the auth flow recently?"
//!
//! # Code health report
//! yepmem insights
//!
//! # Store status and lock state
//! yepmem status
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod progress;

/// yepmem - searchable memory over a repository and its AI sessions
#[derive(Parser, Debug)]
#[command(name = "yepmem")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Repository to operate on (defaults to the current directory)
    #[arg(long, short = 'w', global = true, env = "YEPMEM_WORKDIR")]
    workdir: Option<PathBuf>,

    /// Store directory (defaults to <workdir>/.yep-mem/store)
    #[arg(long, global = true, env = "YEPMEM_STORE")]
    store: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

impl GlobalOptions {
    /// Resolved repository root.
    fn workdir(&self) -> PathBuf {
        self.workdir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Resolved store directory.
    fn store_path(&self) -> PathBuf {
        self.store
            .clone()
            .unwrap_or_else(|| self.workdir().join(".yep-mem").join("store"))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index the repository and new checkpoint sessions
    Ingest(commands::ingest::IngestArgs),

    /// Hybrid search over code and session history
    Search(commands::search::SearchArgs),

    /// Code health report: complexity, dead code, duplicates, co-change
    Insights(commands::insights::InsightsArgs),

    /// Show store counts, watermarks, and lock state
    Status(commands::status::StatusArgs),

    /// Drop all indexed data and caches
    Reset(commands::reset::ResetArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.global.quiet {
        Level::ERROR
    } else if cli.global.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Ingest(args) => commands::ingest::execute(args, cli.global).await,
        Commands::Search(args) => commands::search::execute(args, cli.global).await,
        Commands::Insights(args) => commands::insights::execute(args, cli.global).await,
        Commands::Status(args) => commands::status::execute(args, cli.global).await,
        Commands::Reset(args) => commands::reset::execute(args, cli.global).await,
    }
}

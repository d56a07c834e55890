//! Reset command - drop all indexed data and caches

use anyhow::{Context, Result};
use clap::Args;

use yepmem_config::ConfigStore;
use yepmem_search::{EmbeddingCache, SearchResultCache};
use yepmem_store::SqliteStore;

use crate::GlobalOptions;

/// Arguments for the reset command
#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    yes: bool,
}

/// Execute the reset command
pub async fn execute(args: ResetArgs, global: GlobalOptions) -> Result<()> {
    let store_path = global.store_path();

    if !args.yes {
        eprint!("Drop all indexed data under {}? [y/N] ", store_path.display());
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            eprintln!("Aborted.");
            return Ok(());
        }
    }

    let store = SqliteStore::open(&store_path).context("Failed to open the store")?;
    store.reset().await?;

    EmbeddingCache::open(&store_path).clear()?;
    SearchResultCache::open(&store_path).clear()?;

    let config_store = ConfigStore::new(&store_path);
    config_store.update(|config| {
        config.last_indexed_commit = None;
        config.last_code_index_commit = None;
        config.local_sync_offsets.clear();
    })?;

    if !global.quiet {
        println!("Store, caches, and index watermarks cleared.");
    }
    Ok(())
}

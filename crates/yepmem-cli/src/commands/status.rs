//! Status command - store counts, watermarks, and lock state

use anyhow::{Context, Result};
use clap::Args;

use yepmem_config::ConfigStore;
use yepmem_ingest::SyncLock;
use yepmem_store::SqliteStore;

use crate::GlobalOptions;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format: text (default), json
    #[arg(long, short = 'o', default_value = "text")]
    output: String,
}

/// Execute the status command
pub async fn execute(args: StatusArgs, global: GlobalOptions) -> Result<()> {
    let workdir = global.workdir();
    let store_path = global.store_path();

    let store = SqliteStore::open(&store_path).context("Failed to open the store")?;
    let counts = store.counts().await?;
    let config = ConfigStore::new(&store_path).load()?;
    let lock = SyncLock::new(&workdir);

    if args.output == "json" {
        let status = serde_json::json!({
            "workdir": workdir,
            "store": store_path,
            "codeChunks": counts.code_chunks,
            "transcriptChunks": counts.transcript_chunks,
            "graphEdges": counts.graph_edges,
            "provider": config.provider.as_str(),
            "embeddingModel": config.effective_embedding_model(),
            "lastIndexedCommit": config.last_indexed_commit,
            "lastCodeIndexCommit": config.last_code_index_commit,
            "trackedSessions": config.local_sync_offsets.len(),
            "lockHeld": lock.is_held(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Workdir:           {}", workdir.display());
    println!("Store:             {}", store_path.display());
    println!("Code chunks:       {}", counts.code_chunks);
    println!("Session chunks:    {}", counts.transcript_chunks);
    println!("Graph edges:       {}", counts.graph_edges);
    println!(
        "Provider:          {} ({})",
        config.provider.as_str(),
        config.effective_embedding_model()
    );
    println!(
        "Last indexed:      {}",
        config.last_indexed_commit.as_deref().unwrap_or("never")
    );
    println!("Tracked sessions:  {}", config.local_sync_offsets.len());
    println!(
        "Sync lock:         {}",
        if lock.is_held() { "held" } else { "free" }
    );

    Ok(())
}

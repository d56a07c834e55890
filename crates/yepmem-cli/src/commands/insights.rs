//! Insights command - code health report from the indexed data

use anyhow::{Context, Result};
use clap::Args;

use yepmem_core::analytics::{
    directory_insights, find_dead_code, find_duplicate_clusters, mine_cochange, ComplexityReport,
};
use yepmem_core::SymbolGraph;
use yepmem_ingest::GitClient;
use yepmem_store::SqliteStore;

use crate::GlobalOptions;

/// History window for co-change mining, in days.
const COCHANGE_WINDOW_DAYS: u32 = 90;

/// Arguments for the insights command
#[derive(Args, Debug)]
pub struct InsightsArgs {
    /// Most complex symbols to list
    #[arg(long, default_value = "10")]
    top: usize,

    /// Skip co-change mining (no git history needed)
    #[arg(long)]
    no_cochange: bool,

    /// Output format: text (default), json
    #[arg(long, short = 'o', default_value = "text")]
    output: String,
}

/// Execute the insights command
pub async fn execute(args: InsightsArgs, global: GlobalOptions) -> Result<()> {
    let store_path = global.store_path();
    let store = SqliteStore::open(&store_path).context("Failed to open the store")?;

    let chunks = store.all_code_chunks().await?;
    if chunks.is_empty() {
        eprintln!("Nothing indexed yet. Run `yepmem ingest` first.");
        return Ok(());
    }

    let graph = SymbolGraph::from_edges(store.load_edges().await?);
    let pagerank = store.load_pagerank().await?;

    let mut complexity: Vec<ComplexityReport> =
        chunks.iter().map(ComplexityReport::for_chunk).collect();
    complexity.sort_by(|a, b| b.cognitive.cmp(&a.cognitive));
    complexity.truncate(args.top);

    let dead = find_dead_code(&chunks, &graph);
    let duplicates = find_duplicate_clusters(&chunks);
    let directories = directory_insights(&chunks, &graph, &pagerank);

    let cochange = if args.no_cochange {
        Vec::new()
    } else {
        let git = GitClient::new(global.workdir());
        match git.log_since(COCHANGE_WINDOW_DAYS).await {
            Ok(commits) => mine_cochange(&commits),
            Err(e) => {
                tracing::warn!("Skipping co-change mining: {}", e);
                Vec::new()
            }
        }
    };

    if args.output == "json" {
        let report = serde_json::json!({
            "complexity": complexity,
            "deadCode": dead,
            "duplicates": duplicates,
            "coChange": cochange,
            "directories": directories,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("== Most complex symbols ==");
    for item in &complexity {
        println!(
            "  {:3} cognitive / {:3} cyclomatic  {} ({})",
            item.cognitive, item.cyclomatic, item.symbol, item.path
        );
    }

    println!("\n== Dead code ({} symbols) ==", dead.len());
    for item in dead.iter().take(args.top) {
        println!("  {}:{}  {}", item.path, item.start_line, item.symbol);
    }

    println!("\n== Duplicate clusters ({}) ==", duplicates.len());
    for cluster in duplicates.iter().take(args.top) {
        let members: Vec<String> = cluster
            .members
            .iter()
            .map(|(symbol, path)| format!("{} ({})", symbol, path))
            .collect();
        println!("  {:.0}%  {}", cluster.similarity * 100.0, members.join(", "));
    }

    if !cochange.is_empty() {
        println!("\n== Co-changing files ==");
        for pair in cochange.iter().take(args.top) {
            println!(
                "  {:.0}%  {} -> {} (support {:.2})",
                pair.confidence * 100.0,
                pair.file_a,
                pair.file_b,
                pair.support
            );
        }
    }

    println!("\n== Directories ==");
    for dir in &directories {
        println!(
            "  {:20} {:4} symbols, avg complexity {:.1}, {} dead, {:.0}% documented{}",
            dir.directory,
            dir.symbol_count,
            dir.avg_complexity,
            dir.dead_code_count,
            dir.doc_coverage * 100.0,
            dir.top_symbol
                .as_deref()
                .map(|s| format!(", top: {}", s))
                .unwrap_or_default()
        );
    }

    Ok(())
}

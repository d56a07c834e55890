//! Search command - hybrid retrieval over code and session history

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use yepmem_config::ConfigStore;
use yepmem_search::{create_embedding_provider, HybridSearcher, SearchRequest};
use yepmem_store::{HitKind, SearchFilter, SearchScope, SqliteStore};

use crate::GlobalOptions;

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    query: String,

    /// Maximum number of results to return
    #[arg(long, short = 'n', default_value = "10")]
    limit: usize,

    /// Restrict to code, session transcripts, or both
    #[arg(long, short = 's', value_enum, default_value = "all")]
    scope: ScopeArg,

    /// Boost results touching these files (repeatable)
    #[arg(long, short = 'f')]
    files: Vec<String>,

    /// Restrict transcript hits to one agent
    #[arg(long)]
    agent: Option<String>,

    /// Minimum blended score (0.0 - 1.0)
    #[arg(long)]
    min_score: Option<f32>,

    /// Output format: text (default), json
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScopeArg {
    Code,
    Transcripts,
    All,
}

impl From<ScopeArg> for SearchScope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Code => SearchScope::Code,
            ScopeArg::Transcripts => SearchScope::Transcripts,
            ScopeArg::All => SearchScope::All,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

/// Execute the search command
pub async fn execute(args: SearchArgs, global: GlobalOptions) -> Result<()> {
    let store_path = global.store_path();
    let config = ConfigStore::new(&store_path).load()?;
    let provider = create_embedding_provider(&config).context("Embedding provider unavailable")?;
    let store = Arc::new(SqliteStore::open(&store_path).context("Failed to open the store")?);

    let searcher = HybridSearcher::new(store, provider, &store_path);

    let mut request = SearchRequest::new(&args.query, args.limit);
    request.scope = args.scope.into();
    request.min_score = args.min_score;
    request.filter = SearchFilter {
        files: if args.files.is_empty() {
            None
        } else {
            Some(args.files.clone())
        },
        agent: args.agent.clone(),
        path_prefix: None,
    };

    let results = searcher.search(&request).await.context("Search failed")?;

    if results.is_empty() {
        if !global.quiet {
            eprintln!("No results found for: {}", args.query);
        }
        return Ok(());
    }

    match args.output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&results)
                .context("Failed to serialize results")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            if !global.quiet {
                println!("Found {} results for \"{}\":\n", results.len(), args.query);
            }
            for (i, result) in results.iter().enumerate() {
                match result.hit.kind {
                    HitKind::Code => {
                        println!(
                            "{:2}. [{:.3}] {} ({})",
                            i + 1,
                            result.score,
                            result.hit.symbol.as_deref().unwrap_or("?"),
                            result.hit.path.as_deref().unwrap_or("?"),
                        );
                    }
                    HitKind::Transcript => {
                        println!(
                            "{:2}. [{:.3}] session {} ({})",
                            i + 1,
                            result.score,
                            result.hit.id,
                            result.hit.agent.as_deref().unwrap_or("unknown"),
                        );
                    }
                }
                if let Some(summary) = &result.hit.summary {
                    println!("      {}", summary);
                }
            }
        }
    }

    Ok(())
}

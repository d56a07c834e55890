//! The ingest pipeline.
//!
//! One run drives `parsing -> chunking -> summarizing -> embedding ->
//! indexing` under the cross-process lock, emitting a progress event at
//! every stage boundary. Each boundary is also a cancellation point:
//! committed writes from earlier stages stay, the lock is always released,
//! and a terminal event (`done` or `error`) closes the stream.
//!
//! Stage IO fans out to at most [`FAN_OUT`] concurrent calls; CPU stages
//! (parsing, PageRank) run sequentially.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use yepmem_config::ConfigStore;
use yepmem_core::model::{CodeChunk, TranscriptChunk};
use yepmem_core::{chunk_file_symbols, derive_edges, normalized_pagerank, ParserRegistry, SymbolGraph};
use yepmem_search::{
    create_embedding_provider, create_summarizer, EmbeddingCache, EmbeddingProvider, Summarizer,
    EMBED_BATCH_SIZE,
};
use yepmem_store::SqliteStore;

use crate::checkpoints::{to_transcript_chunks, CheckpointIngester};
use crate::error::{IngestError, Result};
use crate::events::{PipelineStep, ProgressEvent};
use crate::git::GitClient;
use crate::lock::SyncLock;

/// Concurrent IO calls per stage.
const FAN_OUT: usize = 8;

/// Summary token budget.
const SUMMARY_MAX_TOKENS: u32 = 60;

/// Outcome counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub files_indexed: usize,
    pub files_deleted: usize,
    pub code_chunks: usize,
    pub transcript_chunks: usize,
    pub graph_edges: usize,
}

/// Orchestrates one full ingest run.
pub struct IngestPipeline {
    workdir: PathBuf,
    store: Arc<SqliteStore>,
    config_store: ConfigStore,
    embedder: Arc<dyn EmbeddingProvider>,
    summarizer: Arc<dyn Summarizer>,
    embedding_cache: Mutex<EmbeddingCache>,
    git: GitClient,
    registry: ParserRegistry,
}

impl IngestPipeline {
    /// Build a pipeline from the persisted config under `store_path`.
    pub fn from_config(workdir: impl Into<PathBuf>, store_path: &Path) -> Result<Self> {
        let workdir = workdir.into();
        let config_store = ConfigStore::new(store_path);
        let config = config_store.load()?;
        let embedder = create_embedding_provider(&config)?;
        let summarizer = create_summarizer(&config)?;
        let store = Arc::new(SqliteStore::open(store_path)?);
        Ok(Self::with_components(
            workdir, store, config_store, embedder, summarizer, store_path,
        ))
    }

    /// Assemble from explicit components (tests, custom hosts).
    pub fn with_components(
        workdir: PathBuf,
        store: Arc<SqliteStore>,
        config_store: ConfigStore,
        embedder: Arc<dyn EmbeddingProvider>,
        summarizer: Arc<dyn Summarizer>,
        store_path: &Path,
    ) -> Self {
        let git = GitClient::new(&workdir);
        Self {
            workdir,
            store,
            config_store,
            embedder,
            summarizer,
            embedding_cache: Mutex::new(EmbeddingCache::open(store_path)),
            git,
            registry: ParserRegistry::new(),
        }
    }

    /// Run the full pipeline under the sync lock.
    ///
    /// A second concurrent invocation fails fast with
    /// [`IngestError::LockBusy`] instead of queueing.
    pub async fn run(
        &self,
        cancel: &AtomicBool,
        events: &mpsc::Sender<ProgressEvent>,
    ) -> Result<IngestOutcome> {
        let lock = SyncLock::new(&self.workdir);
        if !lock.acquire()? {
            let _ = events.send(ProgressEvent::error("Another sync is running")).await;
            return Err(IngestError::LockBusy);
        }

        let result = self.run_stages(cancel, events).await;

        if let Err(e) = lock.release() {
            warn!("Failed to release sync lock: {}", e);
        }
        match &result {
            Ok(outcome) => {
                let _ = events
                    .send(ProgressEvent::done(format!(
                        "Indexed {} code chunks and {} sessions",
                        outcome.code_chunks, outcome.transcript_chunks
                    )))
                    .await;
            }
            Err(e) => {
                let _ = events.send(ProgressEvent::error(e.to_string())).await;
            }
        }
        result
    }

    async fn run_stages(
        &self,
        cancel: &AtomicBool,
        events: &mpsc::Sender<ProgressEvent>,
    ) -> Result<IngestOutcome> {
        let mut config = self.config_store.load()?;
        let head = self.git.rev_parse_head().await.ok();

        // ------------------------------------------------------------------
        // parsing
        // ------------------------------------------------------------------
        check_cancel(cancel)?;
        let _ = events
            .send(ProgressEvent::progress(
                PipelineStep::Parsing,
                "Collecting checkpoints and changed files",
            ))
            .await;

        let known = self.store.known_checkpoint_ids().await?;
        let mut offsets = config.local_sync_offsets.clone();
        let checkpoints = CheckpointIngester::new(&self.git)
            .collect(&known, &mut offsets)
            .await?;

        let changed = self.changed_source_files(&config).await?;
        let (existing_files, deleted_files): (Vec<PathBuf>, Vec<PathBuf>) = changed
            .into_iter()
            .partition(|rel| self.workdir.join(rel).is_file());
        info!(
            "{} checkpoints, {} changed files, {} deletions",
            checkpoints.len(),
            existing_files.len(),
            deleted_files.len()
        );

        // ------------------------------------------------------------------
        // chunking
        // ------------------------------------------------------------------
        check_cancel(cancel)?;
        let _ = events
            .send(
                ProgressEvent::progress(PipelineStep::Chunking, "Chunking changed files")
                    .with_total(existing_files.len()),
            )
            .await;

        let prior_graph = SymbolGraph::from_edges(self.store.load_edges().await?);
        let prior_summaries: HashMap<String, String> = self
            .store
            .all_code_chunks()
            .await?
            .into_iter()
            .filter_map(|c| c.summary.map(|s| (c.id, s)))
            .collect();

        let graph_ref = if prior_graph.is_empty() {
            None
        } else {
            Some(&prior_graph)
        };
        let mut code_chunks: Vec<CodeChunk> = Vec::new();
        for rel in &existing_files {
            let abs = self.workdir.join(rel);
            let last_modified = file_mtime(&abs);
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            let mut chunks = chunk_file_symbols(
                &self.registry,
                &abs,
                &rel_str,
                &last_modified,
                head.as_deref(),
                graph_ref,
            )?;
            for chunk in &mut chunks {
                if let Some(summary) = prior_summaries.get(&chunk.id) {
                    chunk.summary = Some(summary.clone());
                }
            }
            code_chunks.extend(chunks);
        }

        let mut transcript_chunks: Vec<TranscriptChunk> = checkpoints
            .iter()
            .flat_map(|c| to_transcript_chunks(c))
            .collect();

        // ------------------------------------------------------------------
        // summarizing
        // ------------------------------------------------------------------
        check_cancel(cancel)?;
        let pending_summaries = code_chunks.iter().filter(|c| c.summary.is_none()).count()
            + transcript_chunks.len();
        let _ = events
            .send(
                ProgressEvent::progress(PipelineStep::Summarizing, "Summarizing new chunks")
                    .with_total(pending_summaries),
            )
            .await;

        self.fill_summaries(&mut code_chunks, &mut transcript_chunks)
            .await?;

        // ------------------------------------------------------------------
        // embedding
        // ------------------------------------------------------------------
        check_cancel(cancel)?;
        let total_texts = code_chunks.len() + transcript_chunks.len();
        let _ = events
            .send(
                ProgressEvent::progress(PipelineStep::Embedding, "Embedding chunks")
                    .with_total(total_texts),
            )
            .await;

        let mut texts: Vec<String> = Vec::with_capacity(total_texts);
        texts.extend(code_chunks.iter().map(|c| c.embedding_text.clone()));
        texts.extend(transcript_chunks.iter().map(|c| c.embedding_text.clone()));
        let vectors = self.embed_all(texts).await?;

        let (code_vectors, transcript_vectors) = vectors.split_at(code_chunks.len());
        for (chunk, vector) in code_chunks.iter_mut().zip(code_vectors) {
            chunk.embedding = vector.clone();
        }
        for (chunk, vector) in transcript_chunks.iter_mut().zip(transcript_vectors) {
            chunk.embedding = vector.clone();
        }

        // ------------------------------------------------------------------
        // indexing
        // ------------------------------------------------------------------
        check_cancel(cancel)?;
        let _ = events
            .send(ProgressEvent::progress(
                PipelineStep::Indexing,
                "Writing chunks, rebuilding graph",
            ))
            .await;

        let mut by_path: HashMap<String, Vec<CodeChunk>> = HashMap::new();
        for chunk in code_chunks {
            by_path.entry(chunk.symbol.path.clone()).or_default().push(chunk);
        }
        let mut indexed_chunks = 0;
        for (path, chunks) in &by_path {
            indexed_chunks += self.store.replace_file_chunks(path, chunks).await?;
        }
        for rel in &deleted_files {
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            self.store.delete_code_chunks_by_path(&rel_str).await?;
        }

        let transcript_count = self
            .store
            .upsert_transcript_chunks(&transcript_chunks)
            .await?;

        // Edges rebuild atomically from the full current chunk set
        let full_set = self.store.all_code_chunks().await?;
        let edges = derive_edges(&full_set);
        let edge_count = edges.len();
        self.store.replace_edges(&edges).await?;

        let graph = SymbolGraph::from_edges(edges);
        let scores = normalized_pagerank(&graph);
        self.store.save_pagerank(&scores).await?;

        config.local_sync_offsets = offsets;
        if let Some(head) = &head {
            config.last_indexed_commit = Some(head.clone());
            config.last_code_index_commit = Some(head.clone());
        }
        self.config_store.save(&config)?;

        Ok(IngestOutcome {
            files_indexed: by_path.len(),
            files_deleted: deleted_files.len(),
            code_chunks: indexed_chunks,
            transcript_chunks: transcript_count,
            graph_edges: edge_count,
        })
    }

    /// Changed source files relative to the workdir.
    ///
    /// Incremental runs diff against the last indexed commit; cold starts
    /// (or non-git workdirs) walk the working tree. Unsupported extensions
    /// are dropped either way.
    async fn changed_source_files(
        &self,
        config: &yepmem_config::Config,
    ) -> Result<Vec<PathBuf>> {
        let raw: Vec<String> = match &config.last_code_index_commit {
            Some(commit) => match self.git.changed_files_since(commit).await {
                Ok(files) => files,
                Err(e) => {
                    warn!("Falling back to full walk: {}", e);
                    self.walk_tree()
                }
            },
            None => match self.git.ls_files().await {
                Ok(files) => files,
                Err(_) => self.walk_tree(),
            },
        };

        Ok(raw
            .into_iter()
            .filter(|f| {
                Path::new(f)
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|ext| self.registry.is_supported(ext))
            })
            .map(PathBuf::from)
            .collect())
    }

    /// Working-tree walk honoring ignore files, for non-git cold starts.
    fn walk_tree(&self) -> Vec<String> {
        ignore::WalkBuilder::new(&self.workdir)
            .hidden(true)
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.workdir)
                    .ok()
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
            })
            .collect()
    }

    /// Request one-line summaries for chunks that lack one, capped at
    /// [`FAN_OUT`] concurrent calls.
    async fn fill_summaries(
        &self,
        code_chunks: &mut [CodeChunk],
        transcript_chunks: &mut [TranscriptChunk],
    ) -> Result<()> {
        enum Target {
            Code(usize),
            Transcript(usize),
        }

        let mut jobs: Vec<(Target, String)> = Vec::new();
        for (i, chunk) in code_chunks.iter().enumerate() {
            if chunk.summary.is_none() {
                jobs.push((Target::Code(i), chunk.embedding_text.clone()));
            }
        }
        for (i, chunk) in transcript_chunks.iter().enumerate() {
            if chunk.summary.is_none() {
                jobs.push((Target::Transcript(i), chunk.embedding_text.clone()));
            }
        }
        if jobs.is_empty() {
            return Ok(());
        }
        debug!("Summarizing {} chunks", jobs.len());

        let summarizer = &self.summarizer;
        let results: Vec<(Target, yepmem_search::Result<String>)> = stream::iter(jobs)
            .map(|(target, text)| async move {
                let summary = summarizer.summarize(&text, SUMMARY_MAX_TOKENS).await;
                (target, summary)
            })
            .buffer_unordered(FAN_OUT)
            .collect()
            .await;

        for (target, summary) in results {
            let summary = summary?;
            match target {
                Target::Code(i) => code_chunks[i].summary = Some(summary),
                Target::Transcript(i) => transcript_chunks[i].summary = Some(summary),
            }
        }
        Ok(())
    }

    /// Embed texts through the cache, batching provider calls and fanning
    /// out to [`FAN_OUT`] concurrent batches.
    async fn embed_all(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut vectors: Vec<Option<Vec<f32>>> = vec![None; texts.len()];

        let mut misses: Vec<usize> = Vec::new();
        {
            let mut cache = self.embedding_cache.lock().await;
            for (i, text) in texts.iter().enumerate() {
                match cache.get(text) {
                    Some(vector) => vectors[i] = Some(vector),
                    None => misses.push(i),
                }
            }
        }
        debug!("{} embedding cache misses of {}", misses.len(), texts.len());

        let embedder = &self.embedder;
        let batches: Vec<Vec<usize>> = misses
            .chunks(EMBED_BATCH_SIZE)
            .map(|c| c.to_vec())
            .collect();
        let batch_results: Vec<(Vec<usize>, yepmem_search::Result<Vec<Vec<f32>>>)> =
            stream::iter(batches)
                .map(|indices| {
                    let batch_texts: Vec<String> =
                        indices.iter().map(|i| texts[*i].clone()).collect();
                    async move {
                        let result = embedder.embed(batch_texts).await;
                        (indices, result)
                    }
                })
                .buffer_unordered(FAN_OUT)
                .collect()
                .await;

        let mut fresh: Vec<(String, Vec<f32>)> = Vec::new();
        for (indices, result) in batch_results {
            let batch_vectors = result?;
            for (i, vector) in indices.into_iter().zip(batch_vectors) {
                fresh.push((texts[i].clone(), vector.clone()));
                vectors[i] = Some(vector);
            }
        }
        if !fresh.is_empty() {
            self.embedding_cache.lock().await.put_batch(fresh)?;
        }

        Ok(vectors
            .into_iter()
            .map(|v| v.unwrap_or_default())
            .collect())
    }
}

fn check_cancel(cancel: &AtomicBool) -> Result<()> {
    if cancel.load(Ordering::Relaxed) {
        Err(IngestError::Cancelled)
    } else {
        Ok(())
    }
}

fn file_mtime(path: &Path) -> String {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_is_observed() {
        let cancel = AtomicBool::new(false);
        assert!(check_cancel(&cancel).is_ok());
        cancel.store(true, Ordering::Relaxed);
        assert!(matches!(check_cancel(&cancel), Err(IngestError::Cancelled)));
    }

    #[test]
    fn mtime_of_missing_file_is_empty() {
        assert_eq!(file_mtime(Path::new("/definitely/not/here.ts")), "");
    }
}

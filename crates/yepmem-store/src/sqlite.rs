//! SQLite-backed chunk store with FTS5 full-text and brute-force cosine kNN.
//!
//! One database file `<store_path>/yepmem.db` holds the code and transcript
//! chunk tables, content-synced FTS5 shadows over `embedding_text`, the
//! persisted graph edge set, and PageRank scores.
//!
//! The full record round-trips through a JSON column; embeddings live in a
//! separate little-endian f32 BLOB so the JSON stays readable. Filtered
//! columns (path, agent, checkpoint) are materialized for indexing.
//!
//! Writers (the ingest pipeline) hold the cross-process lock; readers rely
//! on SQLite snapshot semantics and never take it.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rusqlite::{params, Connection};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use yepmem_core::model::{CodeChunk, EdgeType, GraphEdge, TranscriptChunk};
use yepmem_core::text::cosine;

use crate::error::{Result, StoreError};
use crate::types::{HitKind, ScoredHit, SearchFilter, SearchScope};

/// Database file name under the store path.
const DB_FILE_NAME: &str = "yepmem.db";

/// Row counts for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub code_chunks: usize,
    pub transcript_chunks: usize,
    pub graph_edges: usize,
}

/// SQLite store for chunks, edges, and PageRank scores.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database under `store_path`.
    pub fn open(store_path: &Path) -> Result<Self> {
        if !store_path.exists() {
            std::fs::create_dir_all(store_path)?;
        }
        let conn = Connection::open(store_path.join(DB_FILE_NAME))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        // journal_mode returns a row, so it cannot ride in the batch
        let _: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS code_chunks (
                id            TEXT PRIMARY KEY,
                path          TEXT NOT NULL,
                symbol        TEXT NOT NULL,
                last_modified TEXT NOT NULL,
                embedding_text TEXT NOT NULL,
                embedding     BLOB,
                record        TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_code_chunks_path ON code_chunks(path);

            CREATE VIRTUAL TABLE IF NOT EXISTS code_chunks_fts
                USING fts5(embedding_text, content='code_chunks', content_rowid='rowid');

            CREATE TRIGGER IF NOT EXISTS code_chunks_ai AFTER INSERT ON code_chunks BEGIN
                INSERT INTO code_chunks_fts(rowid, embedding_text)
                VALUES (new.rowid, new.embedding_text);
            END;
            CREATE TRIGGER IF NOT EXISTS code_chunks_ad AFTER DELETE ON code_chunks BEGIN
                INSERT INTO code_chunks_fts(code_chunks_fts, rowid, embedding_text)
                VALUES ('delete', old.rowid, old.embedding_text);
            END;
            CREATE TRIGGER IF NOT EXISTS code_chunks_au AFTER UPDATE ON code_chunks BEGIN
                INSERT INTO code_chunks_fts(code_chunks_fts, rowid, embedding_text)
                VALUES ('delete', old.rowid, old.embedding_text);
                INSERT INTO code_chunks_fts(rowid, embedding_text)
                VALUES (new.rowid, new.embedding_text);
            END;

            CREATE TABLE IF NOT EXISTS transcript_chunks (
                id            TEXT PRIMARY KEY,
                checkpoint_id TEXT NOT NULL,
                agent         TEXT,
                timestamp     TEXT,
                files_changed TEXT NOT NULL DEFAULT '[]',
                embedding_text TEXT NOT NULL,
                embedding     BLOB,
                record        TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_transcripts_checkpoint
                ON transcript_chunks(checkpoint_id);

            CREATE VIRTUAL TABLE IF NOT EXISTS transcript_chunks_fts
                USING fts5(embedding_text, content='transcript_chunks', content_rowid='rowid');

            CREATE TRIGGER IF NOT EXISTS transcript_chunks_ai AFTER INSERT ON transcript_chunks BEGIN
                INSERT INTO transcript_chunks_fts(rowid, embedding_text)
                VALUES (new.rowid, new.embedding_text);
            END;
            CREATE TRIGGER IF NOT EXISTS transcript_chunks_ad AFTER DELETE ON transcript_chunks BEGIN
                INSERT INTO transcript_chunks_fts(transcript_chunks_fts, rowid, embedding_text)
                VALUES ('delete', old.rowid, old.embedding_text);
            END;
            CREATE TRIGGER IF NOT EXISTS transcript_chunks_au AFTER UPDATE ON transcript_chunks BEGIN
                INSERT INTO transcript_chunks_fts(transcript_chunks_fts, rowid, embedding_text)
                VALUES ('delete', old.rowid, old.embedding_text);
                INSERT INTO transcript_chunks_fts(rowid, embedding_text)
                VALUES (new.rowid, new.embedding_text);
            END;

            CREATE TABLE IF NOT EXISTS graph_edges (
                id            TEXT PRIMARY KEY,
                source        TEXT NOT NULL,
                target        TEXT NOT NULL,
                edge_type     TEXT NOT NULL,
                source_file   TEXT NOT NULL,
                count         INTEGER NOT NULL,
                commit_sha    TEXT,
                last_modified TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_edges_target ON graph_edges(target);
            CREATE INDEX IF NOT EXISTS idx_edges_source ON graph_edges(source);

            CREATE TABLE IF NOT EXISTS pagerank_scores (
                symbol TEXT PRIMARY KEY,
                score  REAL NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    // ========================================================================
    // Code chunks
    // ========================================================================

    /// Upsert chunks by id.
    pub async fn upsert_code_chunks(&self, chunks: &[CodeChunk]) -> Result<usize> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO code_chunks (id, path, symbol, last_modified, embedding_text, embedding, record)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    path = excluded.path,
                    symbol = excluded.symbol,
                    last_modified = excluded.last_modified,
                    embedding_text = excluded.embedding_text,
                    embedding = excluded.embedding,
                    record = excluded.record
                "#,
            )?;
            for chunk in chunks {
                let record = code_record_json(chunk)?;
                stmt.execute(params![
                    chunk.id,
                    chunk.symbol.path,
                    chunk.symbol.name,
                    chunk.last_modified,
                    chunk.embedding_text,
                    embedding_blob(&chunk.embedding),
                    record,
                ])?;
            }
        }
        tx.commit()?;
        Ok(chunks.len())
    }

    /// Delete every chunk of `path`. Returns the number removed.
    pub async fn delete_code_chunks_by_path(&self, path: &str) -> Result<usize> {
        let conn = self.conn.lock().await;
        let removed = conn.execute("DELETE FROM code_chunks WHERE path = ?1", params![path])?;
        Ok(removed)
    }

    /// Per-file atomic re-index: delete the path's chunks and insert the new
    /// set in one transaction.
    pub async fn replace_file_chunks(&self, path: &str, chunks: &[CodeChunk]) -> Result<usize> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM code_chunks WHERE path = ?1", params![path])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO code_chunks (id, path, symbol, last_modified, embedding_text, embedding, record)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for chunk in chunks {
                let record = code_record_json(chunk)?;
                stmt.execute(params![
                    chunk.id,
                    chunk.symbol.path,
                    chunk.symbol.name,
                    chunk.last_modified,
                    chunk.embedding_text,
                    embedding_blob(&chunk.embedding),
                    record,
                ])?;
            }
        }
        tx.commit()?;
        Ok(chunks.len())
    }

    /// Load every code chunk (embeddings included), for analytics and edge
    /// rebuilds.
    pub async fn all_code_chunks(&self) -> Result<Vec<CodeChunk>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id, record, embedding FROM code_chunks")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<Vec<u8>>>(2)?,
            ))
        })?;

        let mut chunks = Vec::new();
        for row in rows {
            let (id, record, blob) = row?;
            match serde_json::from_str::<CodeChunk>(&record) {
                Ok(mut chunk) => {
                    if let Some(blob) = blob {
                        chunk.embedding = blob_embedding(&blob);
                    }
                    chunks.push(chunk);
                }
                Err(e) => warn!("Skipping corrupt code chunk {}: {}", id, e),
            }
        }
        Ok(chunks)
    }

    // ========================================================================
    // Transcript chunks
    // ========================================================================

    pub async fn upsert_transcript_chunks(&self, chunks: &[TranscriptChunk]) -> Result<usize> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO transcript_chunks
                    (id, checkpoint_id, agent, timestamp, files_changed, embedding_text, embedding, record)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(id) DO UPDATE SET
                    checkpoint_id = excluded.checkpoint_id,
                    agent = excluded.agent,
                    timestamp = excluded.timestamp,
                    files_changed = excluded.files_changed,
                    embedding_text = excluded.embedding_text,
                    embedding = excluded.embedding,
                    record = excluded.record
                "#,
            )?;
            for chunk in chunks {
                let record = transcript_record_json(chunk)?;
                stmt.execute(params![
                    chunk.id,
                    chunk.checkpoint_id,
                    chunk.agent,
                    chunk.timestamp,
                    serde_json::to_string(&chunk.files_changed)?,
                    chunk.embedding_text,
                    embedding_blob(&chunk.embedding),
                    record,
                ])?;
            }
        }
        tx.commit()?;
        Ok(chunks.len())
    }

    pub async fn delete_transcripts_by_checkpoint(&self, checkpoint_id: &str) -> Result<usize> {
        let conn = self.conn.lock().await;
        let removed = conn.execute(
            "DELETE FROM transcript_chunks WHERE checkpoint_id = ?1",
            params![checkpoint_id],
        )?;
        Ok(removed)
    }

    /// Checkpoint ids already ingested.
    pub async fn known_checkpoint_ids(&self) -> Result<HashSet<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT DISTINCT checkpoint_id FROM transcript_chunks")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut ids = HashSet::new();
        for row in rows {
            ids.insert(row?);
        }
        Ok(ids)
    }

    // ========================================================================
    // Retrieval
    // ========================================================================

    /// Brute-force cosine k-NN over the embedding column.
    pub async fn vector_search(
        &self,
        scope: SearchScope,
        query: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredHit>> {
        let conn = self.conn.lock().await;
        let mut hits = Vec::new();

        if scope.includes_code() {
            let mut stmt = conn.prepare(
                "SELECT id, record, embedding FROM code_chunks WHERE embedding IS NOT NULL",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })?;
            for row in rows {
                let (id, record, blob) = row?;
                let Some(hit) = code_hit(&id, &record, 0.0) else {
                    continue;
                };
                if !code_matches_filter(&hit, filter) {
                    continue;
                }
                let score = cosine(query, &blob_embedding(&blob));
                hits.push(ScoredHit { score, ..hit });
            }
        }

        if scope.includes_transcripts() {
            let mut stmt = conn.prepare(
                "SELECT id, record, embedding FROM transcript_chunks WHERE embedding IS NOT NULL",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })?;
            for row in rows {
                let (id, record, blob) = row?;
                let Some(hit) = transcript_hit(&id, &record, 0.0) else {
                    continue;
                };
                if !transcript_matches_filter(&hit, filter) {
                    continue;
                }
                let score = cosine(query, &blob_embedding(&blob));
                hits.push(ScoredHit { score, ..hit });
            }
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    /// FTS5 match over `embedding_text`; `match_expr` is a prebuilt FTS5
    /// expression (see the search crate's tokenizer).
    pub async fn text_search(
        &self,
        scope: SearchScope,
        match_expr: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredHit>> {
        if match_expr.trim().is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().await;
        let mut hits = Vec::new();

        if scope.includes_code() {
            let mut stmt = conn.prepare(
                r#"
                SELECT c.id, c.record, bm25(code_chunks_fts) AS rank
                FROM code_chunks_fts
                JOIN code_chunks c ON c.rowid = code_chunks_fts.rowid
                WHERE code_chunks_fts MATCH ?1
                ORDER BY rank
                LIMIT ?2
                "#,
            )?;
            let rows = stmt.query_map(params![match_expr, k as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })?;
            for row in rows {
                let (id, record, rank) = row?;
                if let Some(hit) = code_hit(&id, &record, -rank as f32) {
                    if code_matches_filter(&hit, filter) {
                        hits.push(hit);
                    }
                }
            }
        }

        if scope.includes_transcripts() {
            let mut stmt = conn.prepare(
                r#"
                SELECT t.id, t.record, bm25(transcript_chunks_fts) AS rank
                FROM transcript_chunks_fts
                JOIN transcript_chunks t ON t.rowid = transcript_chunks_fts.rowid
                WHERE transcript_chunks_fts MATCH ?1
                ORDER BY rank
                LIMIT ?2
                "#,
            )?;
            let rows = stmt.query_map(params![match_expr, k as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })?;
            for row in rows {
                let (id, record, rank) = row?;
                if let Some(hit) = transcript_hit(&id, &record, -rank as f32) {
                    if transcript_matches_filter(&hit, filter) {
                        hits.push(hit);
                    }
                }
            }
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    /// Filtered scan without scoring, newest first.
    pub async fn scan(
        &self,
        scope: SearchScope,
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<ScoredHit>> {
        let conn = self.conn.lock().await;
        let mut hits = Vec::new();

        if scope.includes_code() {
            let mut stmt = conn.prepare(
                "SELECT id, record FROM code_chunks ORDER BY last_modified DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (id, record) = row?;
                if let Some(hit) = code_hit(&id, &record, 0.0) {
                    if code_matches_filter(&hit, filter) {
                        hits.push(hit);
                    }
                }
            }
        }

        if scope.includes_transcripts() {
            let mut stmt = conn.prepare(
                "SELECT id, record FROM transcript_chunks ORDER BY timestamp DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (id, record) = row?;
                if let Some(hit) = transcript_hit(&id, &record, 0.0) {
                    if transcript_matches_filter(&hit, filter) {
                        hits.push(hit);
                    }
                }
            }
        }

        hits.truncate(limit);
        Ok(hits)
    }

    // ========================================================================
    // Graph + PageRank persistence
    // ========================================================================

    /// Merge an edge batch into the persisted set.
    pub async fn insert_edges(&self, edges: &[GraphEdge]) -> Result<usize> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO graph_edges
                    (id, source, target, edge_type, source_file, count, commit_sha, last_modified)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(id) DO UPDATE SET
                    count = graph_edges.count + excluded.count,
                    last_modified = max(graph_edges.last_modified, excluded.last_modified),
                    commit_sha = coalesce(excluded.commit_sha, graph_edges.commit_sha)
                "#,
            )?;
            for edge in edges {
                stmt.execute(params![
                    edge.id,
                    edge.source,
                    edge.target,
                    edge.edge_type.as_str(),
                    edge.source_file,
                    edge.count as i64,
                    edge.commit,
                    edge.last_modified,
                ])?;
            }
        }
        tx.commit()?;
        Ok(edges.len())
    }

    /// Atomically replace the whole edge set (end-of-ingest rebuild).
    pub async fn replace_edges(&self, edges: &[GraphEdge]) -> Result<usize> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM graph_edges", [])?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO graph_edges
                    (id, source, target, edge_type, source_file, count, commit_sha, last_modified)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(id) DO UPDATE SET
                    count = graph_edges.count + excluded.count,
                    last_modified = max(graph_edges.last_modified, excluded.last_modified)
                "#,
            )?;
            for edge in edges {
                stmt.execute(params![
                    edge.id,
                    edge.source,
                    edge.target,
                    edge.edge_type.as_str(),
                    edge.source_file,
                    edge.count as i64,
                    edge.commit,
                    edge.last_modified,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Replaced graph with {} edges", edges.len());
        Ok(edges.len())
    }

    /// Load the persisted edge set.
    pub async fn load_edges(&self) -> Result<Vec<GraphEdge>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, source, target, edge_type, source_file, count, commit_sha, last_modified
             FROM graph_edges",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut edges = Vec::new();
        for row in rows {
            let (id, source, target, edge_type, source_file, count, commit, last_modified) = row?;
            let Some(edge_type) = EdgeType::parse(&edge_type) else {
                warn!("Skipping edge {} with unknown type {}", id, edge_type);
                continue;
            };
            edges.push(GraphEdge {
                id,
                source,
                target,
                edge_type,
                source_file,
                count: count.max(1) as u64,
                commit,
                last_modified,
            });
        }
        Ok(edges)
    }

    /// Replace PageRank scores wholesale.
    pub async fn save_pagerank(&self, scores: &HashMap<String, f64>) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM pagerank_scores", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO pagerank_scores (symbol, score) VALUES (?1, ?2)")?;
            for (symbol, score) in scores {
                stmt.execute(params![symbol, score])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub async fn load_pagerank(&self) -> Result<HashMap<String, f64>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT symbol, score FROM pagerank_scores")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        let mut scores = HashMap::new();
        for row in rows {
            let (symbol, score) = row?;
            scores.insert(symbol, score);
        }
        Ok(scores)
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    pub async fn counts(&self) -> Result<StoreCounts> {
        let conn = self.conn.lock().await;
        let count = |table: &str| -> Result<usize> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            Ok(n as usize)
        };
        Ok(StoreCounts {
            code_chunks: count("code_chunks")?,
            transcript_chunks: count("transcript_chunks")?,
            graph_edges: count("graph_edges")?,
        })
    }

    /// Drop all indexed data.
    pub async fn reset(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(
            "DELETE FROM code_chunks;
             DELETE FROM transcript_chunks;
             DELETE FROM graph_edges;
             DELETE FROM pagerank_scores;",
        )?;
        Ok(())
    }
}

// ============================================================================
// Row conversion
// ============================================================================

/// Record JSON for a code chunk, embedding stripped (it lives in the BLOB).
fn code_record_json(chunk: &CodeChunk) -> std::result::Result<String, StoreError> {
    let mut slim = chunk.clone();
    slim.embedding = Vec::new();
    Ok(serde_json::to_string(&slim)?)
}

fn transcript_record_json(chunk: &TranscriptChunk) -> std::result::Result<String, StoreError> {
    let mut slim = chunk.clone();
    slim.embedding = Vec::new();
    Ok(serde_json::to_string(&slim)?)
}

fn code_hit(id: &str, record: &str, score: f32) -> Option<ScoredHit> {
    match serde_json::from_str::<CodeChunk>(record) {
        Ok(chunk) => Some(ScoredHit {
            id: id.to_string(),
            kind: HitKind::Code,
            symbol: Some(chunk.symbol.name),
            path: Some(chunk.symbol.path),
            files_changed: Vec::new(),
            agent: None,
            timestamp: Some(chunk.last_modified),
            summary: chunk.summary,
            snippet: chunk.symbol.body,
            embedding_text: chunk.embedding_text,
            score,
        }),
        Err(e) => {
            warn!("Skipping corrupt code chunk {}: {}", id, e);
            None
        }
    }
}

fn transcript_hit(id: &str, record: &str, score: f32) -> Option<ScoredHit> {
    match serde_json::from_str::<TranscriptChunk>(record) {
        Ok(chunk) => Some(ScoredHit {
            id: id.to_string(),
            kind: HitKind::Transcript,
            symbol: None,
            path: None,
            files_changed: chunk.files_changed,
            agent: Some(chunk.agent),
            timestamp: Some(chunk.timestamp),
            summary: chunk.summary,
            snippet: chunk.response,
            embedding_text: chunk.embedding_text,
            score,
        }),
        Err(e) => {
            warn!("Skipping corrupt transcript chunk {}: {}", id, e);
            None
        }
    }
}

fn code_matches_filter(hit: &ScoredHit, filter: &SearchFilter) -> bool {
    match (&filter.path_prefix, &hit.path) {
        (Some(prefix), Some(path)) => path.starts_with(prefix.as_str()),
        (Some(_), None) => false,
        (None, _) => true,
    }
}

fn transcript_matches_filter(hit: &ScoredHit, filter: &SearchFilter) -> bool {
    if let Some(agent) = &filter.agent {
        let matches = hit
            .agent
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case(agent));
        if !matches {
            return false;
        }
    }
    if let Some(files) = &filter.files {
        if !files.is_empty() {
            let changed_lower: Vec<String> = hit
                .files_changed
                .iter()
                .map(|f| f.to_lowercase())
                .collect();
            let any = files.iter().any(|f| {
                let f = f.to_lowercase();
                changed_lower.iter().any(|c| c.contains(&f))
            });
            if !any {
                return false;
            }
        }
    }
    true
}

// ============================================================================
// Embedding BLOB codec
// ============================================================================

fn embedding_blob(embedding: &[f32]) -> Option<Vec<u8>> {
    if embedding.is_empty() {
        return None;
    }
    Some(embedding.iter().flat_map(|f| f.to_le_bytes()).collect())
}

fn blob_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

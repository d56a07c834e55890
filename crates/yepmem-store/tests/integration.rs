//! Store integration: upserts, retrieval, graph persistence, reset.

use yepmem_core::model::{
    transcript_id, CodeChunk, EdgeType, GraphEdge, Symbol, SymbolMetadata, SymbolType,
    TranscriptChunk,
};
use yepmem_store::{SearchFilter, SearchScope, SqliteStore};

fn code_chunk(name: &str, path: &str, embedding: Vec<f32>) -> CodeChunk {
    let symbol = Symbol {
        name: name.to_string(),
        symbol_type: SymbolType::Function,
        path: path.to_string(),
        start_line: 1,
        end_line: 5,
        body: format!("function {}() {{ return 1; }}", name),
        doc: None,
        calls: vec![],
        imports: vec![],
        metadata: SymbolMetadata::default(),
    };
    CodeChunk {
        id: yepmem_core::chunk_id(path, name, 1),
        embedding_text: format!("function {} in {}", name, path),
        symbol,
        language: "typescript".to_string(),
        last_modified: "2026-07-01T00:00:00Z".to_string(),
        commit: None,
        summary: None,
        embedding,
    }
}

fn transcript_chunk(checkpoint: &str, session: usize, files: &[&str]) -> TranscriptChunk {
    TranscriptChunk {
        id: transcript_id(checkpoint, session),
        checkpoint_id: checkpoint.to_string(),
        session_index: session,
        agent: "claude-code".to_string(),
        timestamp: "2026-07-15T12:00:00Z".to_string(),
        prompt: "fix the auth bug".to_string(),
        response: "patched token refresh handling".to_string(),
        diff_summary: "auth.ts: 2 files changed".to_string(),
        files_changed: files.iter().map(|f| f.to_string()).collect(),
        symbols: vec!["refreshToken".to_string()],
        summary: None,
        tokens_used: 1200,
        embedding_text: "session about token refresh auth bug".to_string(),
        embedding: vec![0.0, 1.0],
    }
}

#[tokio::test]
async fn upsert_is_idempotent_by_id() {
    let store = SqliteStore::open_in_memory().unwrap();
    let chunk = code_chunk("greet", "src/app.ts", vec![1.0, 0.0]);

    store.upsert_code_chunks(&[chunk.clone()]).await.unwrap();
    store.upsert_code_chunks(&[chunk]).await.unwrap();

    assert_eq!(store.counts().await.unwrap().code_chunks, 1);
}

#[tokio::test]
async fn replace_file_chunks_is_per_file() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .upsert_code_chunks(&[
            code_chunk("a", "src/a.ts", vec![1.0, 0.0]),
            code_chunk("b", "src/b.ts", vec![0.0, 1.0]),
        ])
        .await
        .unwrap();

    store
        .replace_file_chunks("src/a.ts", &[code_chunk("a2", "src/a.ts", vec![0.5, 0.5])])
        .await
        .unwrap();

    let chunks = store.all_code_chunks().await.unwrap();
    let mut names: Vec<&str> = chunks.iter().map(|c| c.symbol.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["a2", "b"]);
}

#[tokio::test]
async fn vector_search_ranks_by_cosine() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .upsert_code_chunks(&[
            code_chunk("aligned", "src/a.ts", vec![1.0, 0.0]),
            code_chunk("orthogonal", "src/b.ts", vec![0.0, 1.0]),
        ])
        .await
        .unwrap();

    let hits = store
        .vector_search(SearchScope::Code, &[1.0, 0.0], 10, &SearchFilter::default())
        .await
        .unwrap();

    assert_eq!(hits[0].symbol.as_deref(), Some("aligned"));
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!(hits[1].score.abs() < 1e-6);
}

#[tokio::test]
async fn fts_matches_embedding_text() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .upsert_code_chunks(&[
            code_chunk("parseConfig", "src/config.ts", vec![1.0, 0.0]),
            code_chunk("render", "src/ui.ts", vec![0.0, 1.0]),
        ])
        .await
        .unwrap();

    let hits = store
        .text_search(
            SearchScope::Code,
            "\"parseconfig\"",
            10,
            &SearchFilter::default(),
        )
        .await
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].symbol.as_deref(), Some("parseConfig"));
}

#[tokio::test]
async fn transcripts_roundtrip_and_filter() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .upsert_transcript_chunks(&[
            transcript_chunk("ab/0123456789", 0, &["src/auth.ts"]),
            transcript_chunk("cd/abcdef0123", 0, &["src/ui.ts"]),
        ])
        .await
        .unwrap();

    let known = store.known_checkpoint_ids().await.unwrap();
    assert!(known.contains("ab/0123456789"));
    assert_eq!(known.len(), 2);

    let filter = SearchFilter {
        files: Some(vec!["auth.ts".to_string()]),
        ..SearchFilter::default()
    };
    let hits = store
        .vector_search(SearchScope::Transcripts, &[0.0, 1.0], 10, &filter)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].files_changed, vec!["src/auth.ts"]);
    assert_eq!(hits[0].agent.as_deref(), Some("claude-code"));
}

#[tokio::test]
async fn scan_returns_filtered_rows_without_scoring() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .upsert_code_chunks(&[
            code_chunk("a", "src/a.ts", vec![1.0]),
            code_chunk("b", "lib/b.ts", vec![1.0]),
        ])
        .await
        .unwrap();

    let filter = SearchFilter {
        path_prefix: Some("src/".to_string()),
        ..SearchFilter::default()
    };
    let hits = store
        .scan(SearchScope::Code, &filter, 10)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path.as_deref(), Some("src/a.ts"));
    assert_eq!(hits[0].score, 0.0);
}

#[tokio::test]
async fn edge_merge_accumulates_counts() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut edge = GraphEdge::new("a", "b", EdgeType::Calls, "src/a.ts");
    edge.last_modified = "2026-07-01T00:00:00Z".to_string();

    store.insert_edges(&[edge.clone()]).await.unwrap();
    let mut newer = edge.clone();
    newer.last_modified = "2026-07-02T00:00:00Z".to_string();
    store.insert_edges(&[newer]).await.unwrap();

    let edges = store.load_edges().await.unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].count, 2);
    assert_eq!(edges[0].last_modified, "2026-07-02T00:00:00Z");
}

#[tokio::test]
async fn replace_edges_rebuilds_atomically() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut stale = GraphEdge::new("old", "gone", EdgeType::Calls, "src/a.ts");
    stale.last_modified = "2026-01-01T00:00:00Z".to_string();
    store.insert_edges(&[stale]).await.unwrap();

    let mut fresh = GraphEdge::new("a", "b", EdgeType::Calls, "src/a.ts");
    fresh.last_modified = "2026-07-01T00:00:00Z".to_string();
    store.replace_edges(&[fresh]).await.unwrap();

    let edges = store.load_edges().await.unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].source, "a");
}

#[tokio::test]
async fn pagerank_scores_roundtrip() {
    let store = SqliteStore::open_in_memory().unwrap();
    let scores = std::collections::HashMap::from([
        ("greet".to_string(), 1.0f64),
        ("helper".to_string(), 0.25),
    ]);
    store.save_pagerank(&scores).await.unwrap();

    let loaded = store.load_pagerank().await.unwrap();
    assert_eq!(loaded, scores);
}

#[tokio::test]
async fn reset_drops_everything() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .upsert_code_chunks(&[code_chunk("a", "src/a.ts", vec![1.0])])
        .await
        .unwrap();
    store
        .upsert_transcript_chunks(&[transcript_chunk("ab/0123456789", 0, &[])])
        .await
        .unwrap();

    store.reset().await.unwrap();
    let counts = store.counts().await.unwrap();
    assert_eq!(counts.code_chunks, 0);
    assert_eq!(counts.transcript_chunks, 0);

    // FTS shadow must be empty too
    let hits = store
        .text_search(SearchScope::All, "\"function\"", 10, &SearchFilter::default())
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = SqliteStore::open(dir.path()).unwrap();
        store
            .upsert_code_chunks(&[code_chunk("persist", "src/p.ts", vec![1.0, 2.0])])
            .await
            .unwrap();
    }
    let store = SqliteStore::open(dir.path()).unwrap();
    let chunks = store.all_code_chunks().await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].embedding, vec![1.0, 2.0]);
}

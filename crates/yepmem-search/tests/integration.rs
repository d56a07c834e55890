//! Hybrid search against a real SQLite store with a stub embedding
//! provider.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use yepmem_core::model::{CodeChunk, Symbol, SymbolMetadata, SymbolType, TranscriptChunk};
use yepmem_search::{EmbeddingProvider, HybridSearcher, SearchRequest};
use yepmem_store::{SearchFilter, SqliteStore};

/// Deterministic 4-dim "embeddings": a few known texts get fixed axes so
/// similarity is controllable from the test.
struct StubProvider;

fn stub_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let axis = |needle: &str| if lower.contains(needle) { 1.0 } else { 0.0 };
    let v = [
        axis("token"),
        axis("render"),
        axis("checkpoint"),
        axis("session"),
    ];
    if v.iter().all(|x| *x == 0.0) {
        return vec![0.0, 0.0, 0.0, 1.0];
    }
    v.to_vec()
}

#[async_trait]
impl EmbeddingProvider for StubProvider {
    async fn embed(&self, texts: Vec<String>) -> yepmem_search::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| stub_vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        4
    }
}

fn code_chunk(name: &str, path: &str, embedding_text: &str) -> CodeChunk {
    let symbol = Symbol {
        name: name.to_string(),
        symbol_type: SymbolType::Function,
        path: path.to_string(),
        start_line: 1,
        end_line: 8,
        body: format!("function {}() {{}}", name),
        doc: None,
        calls: vec![],
        imports: vec![],
        metadata: SymbolMetadata::default(),
    };
    CodeChunk {
        id: yepmem_core::chunk_id(path, name, 1),
        symbol,
        language: "typescript".to_string(),
        last_modified: chrono::Utc::now().to_rfc3339(),
        commit: None,
        summary: None,
        embedding_text: embedding_text.to_string(),
        embedding: stub_vector(embedding_text),
    }
}

fn transcript(checkpoint: &str, files: &[&str], embedding_text: &str) -> TranscriptChunk {
    TranscriptChunk {
        id: yepmem_core::transcript_id(checkpoint, 0),
        checkpoint_id: checkpoint.to_string(),
        session_index: 0,
        agent: "claude-code".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        prompt: "work on it".to_string(),
        response: "done".to_string(),
        diff_summary: String::new(),
        files_changed: files.iter().map(|f| f.to_string()).collect(),
        symbols: vec![],
        summary: None,
        tokens_used: 10,
        embedding_text: embedding_text.to_string(),
        embedding: stub_vector(embedding_text),
    }
}

async fn seeded_searcher(store_dir: &Path) -> HybridSearcher {
    let store = SqliteStore::open(store_dir).unwrap();
    store
        .upsert_code_chunks(&[
            code_chunk("refreshToken", "src/auth.ts", "function refreshToken token auth"),
            code_chunk("renderTree", "src/ui.ts", "function renderTree render ui"),
        ])
        .await
        .unwrap();
    store
        .upsert_transcript_chunks(&[transcript(
            "ab/0123456789",
            &["src/auth.ts"],
            "checkpoint session fixed token refresh",
        )])
        .await
        .unwrap();

    HybridSearcher::new(Arc::new(store), Arc::new(StubProvider), store_dir)
}

#[tokio::test]
async fn finds_relevant_code_first() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");
    let searcher = seeded_searcher(&store_dir).await;

    let results = searcher
        .search(&SearchRequest::new("token refresh", 5))
        .await
        .unwrap();

    assert!(!results.is_empty());
    let top_symbols: Vec<Option<&str>> =
        results.iter().map(|r| r.hit.symbol.as_deref()).collect();
    assert!(top_symbols.contains(&Some("refreshToken")));
    // the unrelated render symbol must not outrank the token hits
    let refresh_pos = results
        .iter()
        .position(|r| r.hit.symbol.as_deref() == Some("refreshToken"))
        .unwrap();
    let render_pos = results
        .iter()
        .position(|r| r.hit.symbol.as_deref() == Some("renderTree"));
    if let Some(render_pos) = render_pos {
        assert!(refresh_pos < render_pos);
    }
}

#[tokio::test]
async fn repeat_query_hits_the_result_cache() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");
    let searcher = seeded_searcher(&store_dir).await;

    let request = SearchRequest::new("token refresh", 3);
    let first = searcher.search(&request).await.unwrap();
    let second = searcher.search(&request).await.unwrap();

    assert_eq!(first.len(), second.len());
    assert_eq!(
        first.iter().map(|r| r.hit.id.clone()).collect::<Vec<_>>(),
        second.iter().map(|r| r.hit.id.clone()).collect::<Vec<_>>()
    );
    // cache file exists beside the store
    assert!(dir.path().join("cache/search-results.json").exists());
}

#[tokio::test]
async fn file_filter_boosts_matching_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");
    let searcher = seeded_searcher(&store_dir).await;

    let mut request = SearchRequest::new("checkpoint session", 5);
    request.filter = SearchFilter {
        files: Some(vec!["auth.ts".to_string()]),
        ..SearchFilter::default()
    };

    let results = searcher.search(&request).await.unwrap();
    let transcript = results
        .iter()
        .find(|r| r.hit.files_changed.iter().any(|f| f.contains("auth")))
        .expect("session touching auth.ts is returned");
    assert!(transcript.score > 0.0);
}

#[tokio::test]
async fn min_score_floors_results() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");
    let searcher = seeded_searcher(&store_dir).await;

    let mut request = SearchRequest::new("token refresh", 5);
    request.min_score = Some(10.0);
    let results = searcher.search(&request).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn top_k_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");
    let searcher = seeded_searcher(&store_dir).await;

    let results = searcher
        .search(&SearchRequest::new("token session checkpoint render", 1))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
}

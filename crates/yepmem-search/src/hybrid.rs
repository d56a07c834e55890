//! Hybrid retrieval: vector + full-text candidates, Reciprocal-Rank
//! Fusion, and intent-weighted reranking.
//!
//! ## Pipeline
//!
//! 1. Result-cache lookup (5-minute TTL)
//! 2. Vector k-NN and FTS retrieval in parallel, each with a pool of
//!    `top_k * 3`
//! 3. RRF fusion (k = 60): rank-only, score-distribution agnostic
//! 4. Rerank with the intent's weight preset over recency, file overlap,
//!    keyword density, and symbol match; vector similarity takes the
//!    remaining weight
//! 5. Optional score floor, truncate, cache

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use yepmem_core::text::{escape_fts, tokenize};
use yepmem_store::{ChunkStore, ScoredHit, SearchFilter, SearchScope};

use crate::cache::{EmbeddingCache, SearchResultCache};
use crate::error::Result;
use crate::intent::{detect_intent, QueryIntent, RerankWeights};
use crate::providers::EmbeddingProvider;

/// RRF constant.
const RRF_K: f32 = 60.0;

/// Candidate pool multiplier over the requested result count.
const POOL_MULTIPLIER: usize = 3;

/// Recency half-life in days.
const RECENCY_HALF_LIFE_DAYS: f64 = 14.0;

/// Share of the final score taken by vector similarity; the intent weight
/// preset (normalized to sum 1) splits the remainder.
const VECTOR_ALPHA: f32 = 0.5;

/// A hybrid search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(rename = "topK")]
    pub top_k: usize,
    #[serde(default)]
    pub filter: SearchFilter,
    #[serde(rename = "minScore", default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
    #[serde(default)]
    pub scope: SearchScope,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
            filter: SearchFilter::default(),
            min_score: None,
            scope: SearchScope::All,
        }
    }
}

/// A reranked search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub hit: ScoredHit,
    /// Final blended score
    pub score: f32,
    /// Cosine similarity from the vector source (0 for FTS-only hits)
    #[serde(rename = "vectorSimilarity")]
    pub vector_similarity: f32,
    /// Intent that selected the rerank weights
    pub intent: QueryIntent,
}

/// Hybrid searcher over a chunk store and an embedding provider.
pub struct HybridSearcher {
    store: Arc<dyn ChunkStore>,
    provider: Arc<dyn EmbeddingProvider>,
    embedding_cache: Mutex<EmbeddingCache>,
    result_cache: Mutex<SearchResultCache>,
}

impl HybridSearcher {
    /// Create a searcher; caches live beside `store_path`.
    pub fn new(
        store: Arc<dyn ChunkStore>,
        provider: Arc<dyn EmbeddingProvider>,
        store_path: &Path,
    ) -> Self {
        Self {
            store,
            provider,
            embedding_cache: Mutex::new(EmbeddingCache::open(store_path)),
            result_cache: Mutex::new(SearchResultCache::open(store_path)),
        }
    }

    /// Run the full hybrid pipeline.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        info!("Hybrid search for: '{}'", request.query);

        let cache_key =
            SearchResultCache::key(&request.query, request.top_k, &request.filter);
        if let Some(cached) = self.result_cache.lock().await.get::<Vec<SearchResult>>(&cache_key)
        {
            debug!("Search cache hit");
            return Ok(cached);
        }

        let intent = detect_intent(&request.query);
        let weights = intent.weights();
        debug!("Query classified as {:?}", intent);

        let query_vector = self.embed_query(&request.query).await?;
        let pool = request.top_k.saturating_mul(POOL_MULTIPLIER).max(1);
        let match_expr = fts_match_expr(&request.query);

        let (vector_hits, fts_hits) = tokio::join!(
            self.store
                .knn(request.scope, &query_vector, pool, &request.filter),
            self.store
                .fts(request.scope, &match_expr, pool, &request.filter),
        );
        let vector_hits = vector_hits?;
        let fts_hits = fts_hits?;
        debug!(
            "Retrieved {} vector and {} full-text candidates",
            vector_hits.len(),
            fts_hits.len()
        );

        let fused = rrf_merge(vector_hits, fts_hits, pool);

        let query_tokens = tokenize(&request.query);
        let now = Utc::now();
        let mut results: Vec<SearchResult> = fused
            .into_iter()
            .map(|candidate| rerank(candidate, &query_tokens, &request.filter, weights, intent, now))
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        if let Some(floor) = request.min_score {
            results.retain(|r| r.score >= floor);
        }
        results.truncate(request.top_k);

        self.result_cache
            .lock()
            .await
            .put(cache_key, &results)?;
        Ok(results)
    }

    /// Embed the query through the embedding cache.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.embedding_cache.lock().await.get(query) {
            return Ok(vector);
        }
        let mut vectors = self.provider.embed(vec![query.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| crate::error::SearchError::Embedding("No vector returned".into()))?;
        self.embedding_cache
            .lock()
            .await
            .put(query, vector.clone())?;
        Ok(vector)
    }
}

/// Candidate carrying fusion state between the merge and rerank stages.
#[derive(Debug, Clone)]
pub(crate) struct FusedCandidate {
    pub hit: ScoredHit,
    pub rrf: f32,
    pub vector_similarity: f32,
}

/// Build the FTS match expression: AND of quoted query tokens.
pub(crate) fn fts_match_expr(query: &str) -> String {
    tokenize(query)
        .into_iter()
        .map(|token| format!("\"{}\"", escape_fts(&token)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Reciprocal-Rank Fusion of the two candidate lists.
///
/// Each source contributes `1 / (60 + rank + 1)`; candidates keep the
/// cosine similarity from the vector source when present. The fused list
/// is sorted by RRF score and truncated to `limit`.
pub(crate) fn rrf_merge(
    vector_hits: Vec<ScoredHit>,
    fts_hits: Vec<ScoredHit>,
    limit: usize,
) -> Vec<FusedCandidate> {
    let mut fused: HashMap<String, FusedCandidate> = HashMap::new();

    for (rank, hit) in vector_hits.into_iter().enumerate() {
        let contribution = 1.0 / (RRF_K + rank as f32 + 1.0);
        let similarity = hit.score;
        fused
            .entry(hit.id.clone())
            .and_modify(|c| {
                c.rrf += contribution;
                c.vector_similarity = similarity;
            })
            .or_insert(FusedCandidate {
                hit,
                rrf: contribution,
                vector_similarity: similarity,
            });
    }

    for (rank, hit) in fts_hits.into_iter().enumerate() {
        let contribution = 1.0 / (RRF_K + rank as f32 + 1.0);
        fused
            .entry(hit.id.clone())
            .and_modify(|c| c.rrf += contribution)
            .or_insert(FusedCandidate {
                hit,
                rrf: contribution,
                vector_similarity: 0.0,
            });
    }

    let mut candidates: Vec<FusedCandidate> = fused.into_values().collect();
    candidates.sort_by(|a, b| {
        b.rrf
            .partial_cmp(&a.rrf)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.hit.id.cmp(&b.hit.id))
    });
    candidates.truncate(limit);
    candidates
}

/// Blend the rerank signals into the final score.
fn rerank(
    candidate: FusedCandidate,
    query_tokens: &[String],
    filter: &SearchFilter,
    weights: RerankWeights,
    intent: QueryIntent,
    now: DateTime<Utc>,
) -> SearchResult {
    let recency = recency_score(candidate.hit.timestamp.as_deref(), now);
    let overlap = file_overlap(filter, &candidate.hit.files_changed);
    let density = keyword_density(query_tokens, &candidate.hit.embedding_text);
    let symbol = symbol_match(query_tokens, candidate.hit.symbol.as_deref());

    let blended = weights.recency * recency
        + weights.file_overlap * overlap
        + weights.keyword_density * density
        + weights.symbol_match * symbol;
    let score =
        VECTOR_ALPHA * candidate.vector_similarity.max(0.0) + (1.0 - VECTOR_ALPHA) * blended;

    SearchResult {
        hit: candidate.hit,
        score,
        vector_similarity: candidate.vector_similarity,
        intent,
    }
}

/// Exponential decay with a 14-day half-life; 0 for missing or invalid
/// timestamps.
pub(crate) fn recency_score(timestamp: Option<&str>, now: DateTime<Utc>) -> f32 {
    let Some(raw) = timestamp else {
        return 0.0;
    };
    let Ok(parsed) = DateTime::parse_from_rfc3339(raw) else {
        return 0.0;
    };
    let age_days = (now - parsed.with_timezone(&Utc)).num_seconds().max(0) as f64 / 86_400.0;
    (-(std::f64::consts::LN_2) * age_days / RECENCY_HALF_LIFE_DAYS).exp() as f32
}

/// Fraction of requested files appearing (case-insensitive, substring) in
/// the candidate's changed files.
fn file_overlap(filter: &SearchFilter, files_changed: &[String]) -> f32 {
    let Some(files) = &filter.files else {
        return 0.0;
    };
    if files.is_empty() || files_changed.is_empty() {
        return 0.0;
    }
    let changed_lower: Vec<String> = files_changed.iter().map(|f| f.to_lowercase()).collect();
    let matched = files
        .iter()
        .filter(|f| {
            let f = f.to_lowercase();
            changed_lower.iter().any(|c| c.contains(&f))
        })
        .count();
    matched as f32 / files.len() as f32
}

/// Fraction of query tokens present in the embedding text.
fn keyword_density(query_tokens: &[String], embedding_text: &str) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let text_tokens: std::collections::HashSet<String> =
        tokenize(embedding_text).into_iter().collect();
    let matched = query_tokens
        .iter()
        .filter(|t| text_tokens.contains(*t))
        .count();
    matched as f32 / query_tokens.len() as f32
}

/// 1.0 when a query token equals the symbol (case-insensitive), 0.5 on a
/// substring relation, 0 otherwise.
fn symbol_match(query_tokens: &[String], symbol: Option<&str>) -> f32 {
    let Some(symbol) = symbol else {
        return 0.0;
    };
    let symbol = symbol.to_lowercase();
    if query_tokens.iter().any(|t| *t == symbol) {
        return 1.0;
    }
    if query_tokens
        .iter()
        .any(|t| symbol.contains(t.as_str()) || t.contains(symbol.as_str()))
    {
        return 0.5;
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use yepmem_store::HitKind;

    fn hit(id: &str, score: f32) -> ScoredHit {
        ScoredHit {
            id: id.to_string(),
            kind: HitKind::Code,
            symbol: Some(id.to_string()),
            path: Some(format!("src/{}.ts", id)),
            files_changed: Vec::new(),
            agent: None,
            timestamp: None,
            summary: None,
            snippet: String::new(),
            embedding_text: format!("function {}", id),
            score,
        }
    }

    #[test]
    fn rrf_shared_candidate_wins() {
        // vector=[a, b], fts=[b, c]: b appears in both sources
        let fused = rrf_merge(
            vec![hit("a", 0.9), hit("b", 0.8)],
            vec![hit("b", 5.0), hit("c", 4.0)],
            5,
        );

        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].hit.id, "b");
        // b keeps its cosine similarity from the vector source
        assert!((fused[0].vector_similarity - 0.8).abs() < 1e-6);
    }

    #[test]
    fn rrf_is_monotonic_in_rank() {
        // a at rank 0 in one source beats c appearing only at rank 1
        let fused = rrf_merge(vec![hit("a", 0.9)], vec![hit("b", 3.0), hit("c", 2.0)], 10);
        let score = |id: &str| fused.iter().find(|c| c.hit.id == id).unwrap().rrf;
        assert!(score("a") > score("c"));
        assert!(score("b") > score("c"));
        // equal-rank singletons tie exactly
        assert!((score("a") - score("b")).abs() < 1e-9);
    }

    #[test]
    fn rrf_truncates_to_limit() {
        let vector: Vec<ScoredHit> = (0..10).map(|i| hit(&format!("v{}", i), 0.5)).collect();
        let fts: Vec<ScoredHit> = (0..10).map(|i| hit(&format!("f{}", i), 1.0)).collect();
        assert_eq!(rrf_merge(vector, fts, 7).len(), 7);
    }

    #[test]
    fn recency_half_life() {
        let now = Utc::now();
        let fresh = now.to_rfc3339();
        let old = (now - Duration::days(14)).to_rfc3339();

        let fresh_score = recency_score(Some(&fresh), now);
        let old_score = recency_score(Some(&old), now);

        assert!((fresh_score - 1.0).abs() < 0.01);
        assert!((old_score - 0.5 * fresh_score).abs() < 0.01 * fresh_score);
    }

    #[test]
    fn recency_invalid_is_zero() {
        let now = Utc::now();
        assert_eq!(recency_score(None, now), 0.0);
        assert_eq!(recency_score(Some("not a date"), now), 0.0);
    }

    #[test]
    fn keyword_density_fraction() {
        let tokens = tokenize("token refresh logic");
        assert_eq!(tokens.len(), 3);
        let density = keyword_density(&tokens, "handles token refresh for sessions");
        assert!((density - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn symbol_match_tiers() {
        let tokens = tokenize("refreshtoken handler");
        assert_eq!(symbol_match(&tokens, Some("refreshToken")), 1.0);
        assert_eq!(symbol_match(&tokens, Some("refreshTokenSilently")), 0.5);
        assert_eq!(symbol_match(&tokens, Some("unrelated")), 0.0);
        assert_eq!(symbol_match(&tokens, None), 0.0);
    }

    #[test]
    fn file_overlap_fraction() {
        let filter = SearchFilter {
            files: Some(vec!["Auth.ts".to_string(), "ui.ts".to_string()]),
            ..SearchFilter::default()
        };
        let changed = vec!["src/auth.ts".to_string(), "src/db.ts".to_string()];
        assert!((file_overlap(&filter, &changed) - 0.5).abs() < 1e-6);
        assert_eq!(file_overlap(&SearchFilter::default(), &changed), 0.0);
    }

    #[test]
    fn fts_expr_quotes_and_joins() {
        assert_eq!(
            fts_match_expr("token refresh in auth.ts"),
            "\"token\" AND \"refresh\" AND \"auth\""
        );
        assert_eq!(fts_match_expr("a b"), "");
    }
}

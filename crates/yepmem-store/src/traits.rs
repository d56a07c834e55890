//! Retrieval trait implemented by store backends.
//!
//! The search engine only needs the two retrieval primitives; everything
//! else (upserts, graph persistence, maintenance) is backend-specific and
//! owned by the ingest side.

use async_trait::async_trait;

use crate::error::Result;
use crate::sqlite::SqliteStore;
use crate::types::{ScoredHit, SearchFilter, SearchScope};

/// Backend retrieval interface for hybrid search.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Cosine k-NN over the embedding column.
    async fn knn(
        &self,
        scope: SearchScope,
        query: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredHit>>;

    /// Full-text match over `embedding_text`; `match_expr` is a prebuilt
    /// FTS expression.
    async fn fts(
        &self,
        scope: SearchScope,
        match_expr: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredHit>>;
}

#[async_trait]
impl ChunkStore for SqliteStore {
    async fn knn(
        &self,
        scope: SearchScope,
        query: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredHit>> {
        self.vector_search(scope, query, k, filter).await
    }

    async fn fts(
        &self,
        scope: SearchScope,
        match_expr: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredHit>> {
        self.text_search(scope, match_expr, k, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait must stay object-safe: the search engine holds `dyn ChunkStore`
    fn _assert_object_safe(_: &dyn ChunkStore) {}
}

//! yepmem-search - Hybrid retrieval, providers, and query caches
//!
//! The read path of the knowledge base:
//! - OpenAI-compatible embedding + summarizer providers (OpenAI, Ollama)
//! - on-disk embedding and search-result caches
//! - regex-family query intent classification with rerank weight presets
//! - hybrid vector + full-text search with RRF fusion and intent-weighted
//!   reranking
//!
//! This crate never writes to the chunk store; failures surface to the
//! caller and leave caches untouched.

pub mod cache;
mod error;
pub mod hybrid;
pub mod intent;
pub mod providers;

pub use cache::{EmbeddingCache, SearchResultCache};
pub use error::{Result, SearchError};
pub use hybrid::{HybridSearcher, SearchRequest, SearchResult};
pub use intent::{detect_intent, QueryIntent, RerankWeights};
pub use providers::{
    create_embedding_provider, create_summarizer, EmbeddingProvider, Summarizer, EMBED_BATCH_SIZE,
};

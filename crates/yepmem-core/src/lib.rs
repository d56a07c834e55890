//! yepmem-core - Symbol extraction, graph construction, and code analytics
//!
//! This crate provides the compute layer of the yepmem knowledge base:
//! - Tree-sitter symbol extraction for TypeScript/JavaScript, Python, Go, Rust
//! - Chunk construction with graph-enriched embedding text
//! - In-memory symbol graph with merge-on-insert edges
//! - PageRank centrality
//! - Analytics: complexity, dead code, duplicate clusters, co-change mining,
//!   directory insights

pub mod analytics;
pub mod chunker;
pub mod error;
pub mod graph;
pub mod model;
pub mod pagerank;
pub mod parser;
pub mod text;

// Re-exports for convenience
pub use chunker::{build_embedding_text, chunk_file_symbols, chunk_symbols};
pub use error::{CoreError, Result};
pub use graph::{derive_edges, SymbolGraph};
pub use model::{
    chunk_id, edge_id, transcript_id, truncated_sha256, CodeChunk, EdgeType, GraphEdge, Symbol,
    SymbolMetadata, SymbolType, TranscriptChunk,
};
pub use pagerank::{normalized_pagerank, pagerank};
pub use parser::{ParserRegistry, SupportedLanguage};
pub use text::{cosine, escape_fts, tokenize};

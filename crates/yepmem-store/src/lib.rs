//! yepmem-store - SQLite-backed chunk, graph, and score persistence
//!
//! Provides the durable half of the knowledge base:
//! - code and transcript chunk tables with FTS5 full-text shadows
//! - brute-force cosine k-NN over stored embeddings
//! - the persisted symbol-graph edge set with merge-on-conflict counts
//! - PageRank score storage

mod error;
mod sqlite;
mod traits;
mod types;

pub use error::{Result, StoreError};
pub use sqlite::{SqliteStore, StoreCounts};
pub use traits::ChunkStore;
pub use types::{HitKind, ScoredHit, SearchFilter, SearchScope};

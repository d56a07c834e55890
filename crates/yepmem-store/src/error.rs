//! Error types for yepmem-store

use thiserror::Error;

/// Errors that can occur in store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored record failed to deserialize
    #[error("Corrupt record {id}: {source}")]
    CorruptRecord {
        id: String,
        source: serde_json::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for yepmem-store operations
pub type Result<T> = std::result::Result<T, StoreError>;

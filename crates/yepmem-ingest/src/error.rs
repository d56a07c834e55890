//! Error types for yepmem-ingest

use thiserror::Error;

/// Errors that can occur during ingestion
#[derive(Debug, Error)]
pub enum IngestError {
    /// Another ingest holds the lock
    #[error("Another sync is already running (lock held)")]
    LockBusy,

    /// The run was cancelled by the caller
    #[error("Ingest cancelled")]
    Cancelled,

    /// A git subprocess failed
    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    /// Store error
    #[error(transparent)]
    Store(#[from] yepmem_store::StoreError),

    /// Provider/search error
    #[error(transparent)]
    Search(#[from] yepmem_search::SearchError),

    /// Config error
    #[error(transparent)]
    Config(#[from] yepmem_config::ConfigError),

    /// Parser error
    #[error(transparent)]
    Core(#[from] yepmem_core::CoreError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for yepmem-ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

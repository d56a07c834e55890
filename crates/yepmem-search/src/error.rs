//! Error types for yepmem-search

use thiserror::Error;

/// Errors that can occur in search and provider operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// Provider endpoint unreachable or transient failure (retryable)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Authentication failed (non-retryable, surfaced verbatim)
    #[error("Provider authentication failed: {0}")]
    ProviderAuth(String),

    /// Requested model not found (non-retryable)
    #[error("Provider model not found: {0}")]
    InvalidModel(String),

    /// Provider rate limited
    #[error("Provider rate limited, retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// Missing API key for a provider that requires one
    #[error("Missing API key for provider {0}")]
    MissingApiKey(String),

    /// Embedding response malformed or empty
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Store error during retrieval
    #[error(transparent)]
    Store(#[from] yepmem_store::StoreError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// Whether a retry can help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SearchError::ProviderUnavailable(_) | SearchError::RateLimited { .. }
        )
    }
}

/// Result type for yepmem-search operations
pub type Result<T> = std::result::Result<T, SearchError>;

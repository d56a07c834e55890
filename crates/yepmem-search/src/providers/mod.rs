//! Embedding and summarization providers.
//!
//! One OpenAI-compatible HTTP implementation serves both configured
//! backends: the hosted OpenAI API and a local Ollama endpoint exposing the
//! same wire format.

pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;

use yepmem_config::{Config, Provider};

use crate::error::{Result, SearchError};

/// Maximum texts per embedding request.
pub const EMBED_BATCH_SIZE: usize = 100;

/// Generates embedding vectors for text batches.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed up to [`EMBED_BATCH_SIZE`] texts, one vector per input in
    /// order.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Vector dimension of the configured model.
    fn dimension(&self) -> usize;
}

/// Produces one-line summaries.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `text` in at most `max_tokens` tokens.
    async fn summarize(&self, text: &str, max_tokens: u32) -> Result<String>;
}

/// Build the embedding provider selected by the config.
pub fn create_embedding_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = openai::OpenAiCompatProvider::from_config(config)?;
    tracing::info!(
        "Using {} embeddings via {} (dim={})",
        config.effective_embedding_model(),
        config.effective_base_url(),
        provider.dimension(),
    );
    Ok(Arc::new(provider))
}

/// Build the summarizer selected by the config.
pub fn create_summarizer(config: &Config) -> Result<Arc<dyn Summarizer>> {
    Ok(Arc::new(openai::OpenAiCompatProvider::from_config(config)?))
}

/// Shared key check: the hosted provider refuses to start without a key.
pub(crate) fn require_api_key(config: &Config) -> Result<Option<String>> {
    match config.provider {
        Provider::Openai => match &config.openai_api_key {
            Some(key) if !key.is_empty() => Ok(Some(key.clone())),
            _ => Err(SearchError::MissingApiKey("openai".to_string())),
        },
        Provider::Ollama => Ok(None),
    }
}

//! OpenAI-compatible embedding + chat provider.
//!
//! Speaks the `/v1/embeddings` and `/v1/chat/completions` wire format used
//! by OpenAI and Ollama alike:
//!
//! - POST `{base_url}/embeddings`
//!   `{"model": "...", "input": ["text1", ...]}` ->
//!   `{"data": [{"embedding": [...], "index": 0}, ...]}`
//! - POST `{base_url}/chat/completions`
//!   `{"model": "...", "messages": [...], "max_tokens": N}` ->
//!   `{"choices": [{"message": {"content": "..."}}]}`
//!
//! Transient failures retry 3 times with exponential backoff
//! (100ms * 2^n plus jitter); auth and model errors fail immediately.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use yepmem_config::Config;

use super::{require_api_key, EmbeddingProvider, Summarizer, EMBED_BATCH_SIZE};
use crate::error::{Result, SearchError};

/// Request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Retries after the initial attempt.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff.
const RETRY_BASE_DELAY_MS: u64 = 100;

/// Upper bound of the random jitter added to each backoff sleep.
const RETRY_JITTER_MS: u64 = 50;

/// OpenAI-compatible provider for embeddings and summaries.
pub struct OpenAiCompatProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    embedding_model: String,
    summarizer_model: String,
    dimension: usize,
}

impl OpenAiCompatProvider {
    /// Build from the workspace config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = require_api_key(config)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SearchError::ProviderUnavailable(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.effective_base_url().trim_end_matches('/').to_string(),
            api_key,
            embedding_model: config.effective_embedding_model().to_string(),
            summarizer_model: config.effective_summarizer_model().to_string(),
            dimension: config.embedding_dimension(),
        })
    }

    /// Test constructor pointing at an arbitrary endpoint.
    pub fn with_endpoint(
        base_url: impl Into<String>,
        api_key: Option<String>,
        embedding_model: impl Into<String>,
        summarizer_model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SearchError::ProviderUnavailable(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            embedding_model: embedding_model.into(),
            summarizer_model: summarizer_model.into(),
            dimension,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        if self.base_url.ends_with("/v1") {
            format!("{}/{}", self.base_url, endpoint)
        } else {
            format!("{}/v1/{}", self.base_url, endpoint)
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    /// Run `op` with the retry policy for transient failures.
    async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    let delay = RETRY_BASE_DELAY_MS * (1 << attempt) + jitter_ms();
                    debug!("Retrying provider call in {}ms after: {}", delay, e);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn embeddings_request(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingsRequest {
            model: self.embedding_model.clone(),
            input: texts,
        };
        let response = self
            .authorize(self.client.post(self.url("embeddings")))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let body: EmbeddingsResponse = response.json().await.map_err(|e| {
                    SearchError::ProviderUnavailable(format!("Invalid response: {}", e))
                })?;
                let mut data = body.data;
                data.sort_by_key(|d| d.index);
                Ok(data.into_iter().map(|d| d.embedding).collect())
            }
            other => Err(status_error(other, response).await),
        }
    }

    async fn chat_request(&self, text: &str, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: self.summarizer_model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "Summarize the following in one short line. Output only the summary."
                        .to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            max_tokens,
            temperature: 0.0,
        };

        let response = self
            .authorize(self.client.post(self.url("chat/completions")))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let body: ChatResponse = response.json().await.map_err(|e| {
                    SearchError::ProviderUnavailable(format!("Invalid response: {}", e))
                })?;
                body.choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content.trim().to_string())
                    .ok_or_else(|| {
                        SearchError::ProviderUnavailable("Empty chat response".to_string())
                    })
            }
            other => Err(status_error(other, response).await),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatProvider {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let batch = batch.to_vec();
            let vectors = self
                .with_retry(|| self.embeddings_request(batch.clone()))
                .await?;
            if vectors.len() != batch.len() {
                return Err(SearchError::Embedding(format!(
                    "Provider returned {} vectors for {} inputs",
                    vectors.len(),
                    batch.len()
                )));
            }
            out.extend(vectors);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl Summarizer for OpenAiCompatProvider {
    async fn summarize(&self, text: &str, max_tokens: u32) -> Result<String> {
        self.with_retry(|| self.chat_request(text, max_tokens)).await
    }
}

fn transport_error(e: reqwest::Error) -> SearchError {
    if e.is_timeout() {
        SearchError::ProviderUnavailable("Request timed out".to_string())
    } else if e.is_connect() {
        SearchError::ProviderUnavailable(format!("Connection failed: {}", e))
    } else {
        SearchError::ProviderUnavailable(format!("Request failed: {}", e))
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> SearchError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let body = response.text().await.unwrap_or_default();
            SearchError::ProviderAuth(body)
        }
        StatusCode::NOT_FOUND => {
            let body = response.text().await.unwrap_or_default();
            SearchError::InvalidModel(body)
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            SearchError::RateLimited { retry_after }
        }
        other if other.is_client_error() => {
            let body = response.text().await.unwrap_or_default();
            SearchError::ProviderAuth(format!("{}: {}", other, body))
        }
        other => {
            let body = response.text().await.unwrap_or_default();
            SearchError::ProviderUnavailable(format!("{}: {}", other, body))
        }
    }
}

/// Sub-resolution clock noise as backoff jitter.
fn jitter_ms() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    nanos % RETRY_JITTER_MS
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

// ============================================================================
// Tests
// ============================================================================

//! yepmem-config - Configuration loading and atomic persistence
//!
//! One JSON document at `<store_path>/config.json` holds the provider
//! selection, model overrides, index watermarks, and per-session sync
//! offsets. Loads fall back to defaults when the file is absent; saves go
//! through write-temp-then-rename so a crashed writer never leaves a
//! half-written config behind.

mod error;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub use error::{ConfigError, Result};

/// Configuration file name under the store path.
const CONFIG_FILE_NAME: &str = "config.json";

/// Embedding/summarization provider selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Openai,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Openai => "openai",
            Provider::Ollama => "ollama",
        }
    }
}

/// Persistent configuration for one indexed workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Provider backing embeddings and summaries
    #[serde(default)]
    pub provider: Provider,

    /// Embedding model override (provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,

    /// Summarizer model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarizer_model: Option<String>,

    /// API key for the openai provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    /// Base URL for the ollama provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama_base_url: Option<String>,

    /// Indexing scope label (e.g. repository name)
    #[serde(default)]
    pub scope: String,

    /// Last checkpoint-ingest commit watermark
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_indexed_commit: Option<String>,

    /// Last code-index commit watermark
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_code_index_commit: Option<String>,

    /// Byte offsets consumed per local session transcript
    #[serde(default)]
    pub local_sync_offsets: HashMap<String, u64>,
}

impl Config {
    /// Default embedding model for the configured provider.
    pub fn effective_embedding_model(&self) -> &str {
        if let Some(model) = self.embedding_model.as_deref() {
            return model;
        }
        match self.provider {
            Provider::Openai => "text-embedding-3-small",
            Provider::Ollama => "nomic-embed-text",
        }
    }

    /// Default summarizer model for the configured provider.
    pub fn effective_summarizer_model(&self) -> &str {
        if let Some(model) = self.summarizer_model.as_deref() {
            return model;
        }
        match self.provider {
            Provider::Openai => "gpt-4o-mini",
            Provider::Ollama => "llama3.2",
        }
    }

    /// API base URL for the configured provider.
    pub fn effective_base_url(&self) -> &str {
        match self.provider {
            Provider::Openai => "https://api.openai.com/v1",
            Provider::Ollama => self
                .ollama_base_url
                .as_deref()
                .unwrap_or("http://localhost:11434/v1"),
        }
    }

    /// Embedding dimension of the effective model.
    pub fn embedding_dimension(&self) -> usize {
        match self.effective_embedding_model() {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            "text-embedding-ada-002" => 1536,
            "nomic-embed-text" => 768,
            _ => 768,
        }
    }
}

/// Loads and persists [`Config`] under a store directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store rooted at `store_path` (the config lives at
    /// `<store_path>/config.json`).
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            path: store_path.into().join(CONFIG_FILE_NAME),
        }
    }

    /// Path of the config file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config, defaulting when the file does not exist.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            trace!("Config not found at {:?}, using defaults", self.path);
            return Ok(Config::default());
        }

        debug!("Loading config from {:?}", self.path);
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ConfigError::read_file(&self.path, e))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::parse_json(&self.path, e))
    }

    /// Persist the config atomically (write-temp-then-rename).
    pub fn save(&self, config: &Config) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = serde_json::to_string_pretty(config)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| ConfigError::write_file(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| ConfigError::write_file(&self.path, e))?;

        debug!("Saved config to {:?}", self.path);
        Ok(())
    }

    /// Read-modify-write under the same atomic replace.
    pub fn update(&self, mutate: impl FnOnce(&mut Config)) -> Result<Config> {
        let mut config = self.load()?;
        mutate(&mut config);
        self.save(&config)?;
        Ok(config)
    }
}

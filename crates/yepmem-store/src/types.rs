//! Query-side types shared by the store and the search engine.

use serde::{Deserialize, Serialize};

/// Which chunk tables a query touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    Code,
    Transcripts,
    #[default]
    All,
}

impl SearchScope {
    pub fn includes_code(&self) -> bool {
        matches!(self, SearchScope::Code | SearchScope::All)
    }

    pub fn includes_transcripts(&self) -> bool {
        matches!(self, SearchScope::Transcripts | SearchScope::All)
    }
}

/// Optional narrowing applied to candidate retrieval and reranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    /// File names used by the file-overlap rerank signal; also narrows
    /// transcript retrieval to sessions touching any of them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,

    /// Restrict transcripts to one agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    /// Restrict code chunks to a path prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.files.is_none() && self.agent.is_none() && self.path_prefix.is_none()
    }
}

/// Where a hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    Code,
    Transcript,
}

/// One retrieval candidate with enough context to rerank and render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredHit {
    pub id: String,
    pub kind: HitKind,
    /// Symbol name for code hits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// File path for code hits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Files touched, for transcript hits
    #[serde(rename = "filesChanged", default, skip_serializing_if = "Vec::is_empty")]
    pub files_changed: Vec<String>,
    /// Producing agent, for transcript hits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// RFC 3339 timestamp used for recency scoring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Body or response text for display
    pub snippet: String,
    #[serde(rename = "embeddingText")]
    pub embedding_text: String,
    /// Backend-relative score: cosine similarity for vector hits,
    /// negated bm25 for full-text hits. Named distinctly so rerank layers
    /// can flatten this record next to their own blended score.
    #[serde(rename = "retrievalScore")]
    pub score: f32,
}

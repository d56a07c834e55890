//! Pipeline progress events and their SSE encoding.

use serde::{Deserialize, Serialize};

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStep {
    Idle,
    Parsing,
    Chunking,
    Summarizing,
    Embedding,
    Indexing,
    Done,
    Error,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Idle => "idle",
            PipelineStep::Parsing => "parsing",
            PipelineStep::Chunking => "chunking",
            PipelineStep::Summarizing => "summarizing",
            PipelineStep::Embedding => "embedding",
            PipelineStep::Indexing => "indexing",
            PipelineStep::Done => "done",
            PipelineStep::Error => "error",
        }
    }
}

/// Event name on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    #[default]
    Progress,
    Done,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Progress => "progress",
            EventKind::Done => "done",
            EventKind::Error => "error",
        }
    }
}

/// One progress event emitted by the ingest pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(skip)]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<PipelineStep>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl ProgressEvent {
    pub fn progress(step: PipelineStep, message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Progress,
            step: Some(step),
            message: message.into(),
            total: None,
        }
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    pub fn done(message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Done,
            step: Some(PipelineStep::Done),
            message: message.into(),
            total: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Error,
            step: Some(PipelineStep::Error),
            message: message.into(),
            total: None,
        }
    }

    /// SSE-compatible textual form: `event: <name>\ndata: <json>\n\n`.
    pub fn to_sse(&self) -> String {
        let data = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("event: {}\ndata: {}\n\n", self.kind.as_str(), data)
    }
}

//! Record types shared across the yepmem workspace.
//!
//! Three families of records flow through the system:
//! - [`Symbol`]: raw parser output, one per declaration in a source file
//! - [`CodeChunk`] / [`TranscriptChunk`]: persisted, embeddable index records
//! - [`GraphEdge`]: a persisted relationship between two symbols
//!
//! Identifiers are content-derived (truncated SHA-256) so re-indexing the
//! same source produces the same ids on every platform.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of truncated hex ids for chunks and transcripts.
const ID_LEN: usize = 24;

// ============================================================================
// Symbols
// ============================================================================

/// Classification of an extracted code symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolType {
    Function,
    Method,
    Class,
    Interface,
    /// Type alias (`type Foo = ...`)
    #[serde(rename = "type")]
    TypeAlias,
    Enum,
    /// A markup-returning function with a PascalCase name (TSX/JSX only)
    Component,
    Variable,
    Constant,
    Module,
}

impl SymbolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolType::Function => "function",
            SymbolType::Method => "method",
            SymbolType::Class => "class",
            SymbolType::Interface => "interface",
            SymbolType::TypeAlias => "type",
            SymbolType::Enum => "enum",
            SymbolType::Component => "component",
            SymbolType::Variable => "variable",
            SymbolType::Constant => "constant",
            SymbolType::Module => "module",
        }
    }
}

impl std::fmt::Display for SymbolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional per-symbol metadata.
///
/// All fields are optional to support graceful degradation across languages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMetadata {
    /// Parameter list as written in the source (names, possibly typed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<String>>,

    /// Declared return type, when the grammar exposes one
    #[serde(rename = "returnType", skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,

    /// Async function/method
    #[serde(rename = "isAsync", skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,

    /// Visibility: "public", "private", "protected"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,

    /// Exported from its module (`export`, `pub`, uppercase Go identifier)
    #[serde(rename = "isExported", skip_serializing_if = "Option::is_none")]
    pub is_exported: Option<bool>,

    /// Generic/type parameters as written
    #[serde(rename = "genericParams", skip_serializing_if = "Option::is_none")]
    pub generic_params: Option<Vec<String>>,
}

impl SymbolMetadata {
    pub fn is_empty(&self) -> bool {
        self.parameters.is_none()
            && self.return_type.is_none()
            && self.is_async.is_none()
            && self.visibility.is_none()
            && self.is_exported.is_none()
            && self.generic_params.is_none()
    }
}

/// A single extracted declaration.
///
/// Invariants: `start_line <= end_line`; `body` is the exact source text of
/// the span; methods are named `Class.method`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Symbol name; methods use the `Class.method` form
    pub name: String,

    /// Classification
    #[serde(rename = "symbolType")]
    pub symbol_type: SymbolType,

    /// Source file path, relative to the repository root
    pub path: String,

    /// Starting line (1-indexed)
    #[serde(rename = "startLine")]
    pub start_line: usize,

    /// Ending line (1-indexed)
    #[serde(rename = "endLine")]
    pub end_line: usize,

    /// Exact source text of the declaration span
    pub body: String,

    /// Nearest documentation comment above the declaration, markers stripped
    #[serde(rename = "jsDoc", skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Identifiers used in call position within the body, deduplicated,
    /// order-preserving
    pub calls: Vec<String>,

    /// Imported identifiers referenced from the body
    pub imports: Vec<String>,

    /// Language-specific metadata
    #[serde(default, skip_serializing_if = "SymbolMetadata::is_empty")]
    pub metadata: SymbolMetadata,
}

impl Symbol {
    /// Whether this symbol is an entry point that must never be reported as
    /// dead code (`main`, default exports, components).
    pub fn is_entry_point(&self) -> bool {
        self.name == "main"
            || self.name.ends_with(".main")
            || self.symbol_type == SymbolType::Component
            || self.metadata.is_exported == Some(true) && self.name == "default"
    }
}

// ============================================================================
// Chunks
// ============================================================================

/// A persisted, embeddable code index record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChunk {
    /// Stable content-derived id: `sha256(path:symbol:start_line)[..24]`
    pub id: String,

    #[serde(flatten)]
    pub symbol: Symbol,

    /// Language tag (extension-derived, e.g. "typescript", "rust")
    pub language: String,

    /// Last filesystem modification, RFC 3339
    #[serde(rename = "lastModified")]
    pub last_modified: String,

    /// HEAD commit at index time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    /// One-line LLM summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Text submitted to the embedding provider
    #[serde(rename = "embeddingText")]
    pub embedding_text: String,

    /// Embedding vector; dimension fixed by the configured model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

/// Compute the stable chunk id for `(path, symbol, start_line)`.
pub fn chunk_id(path: &str, symbol: &str, start_line: usize) -> String {
    truncated_sha256(&format!("{}:{}:{}", path, symbol, start_line))
}

/// A persisted, embeddable AI-session index record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    /// Stable id: `sha256(checkpoint_id:session_index)[..24]`
    pub id: String,

    #[serde(rename = "checkpointId")]
    pub checkpoint_id: String,

    #[serde(rename = "sessionIndex")]
    pub session_index: usize,

    /// Agent that produced the session (e.g. "claude-code")
    pub agent: String,

    /// Session timestamp, RFC 3339
    pub timestamp: String,

    /// User prompt that started the session
    pub prompt: String,

    /// Concatenated assistant output
    pub response: String,

    /// Human-readable diff summary
    #[serde(rename = "diffSummary")]
    pub diff_summary: String,

    /// Files touched during the session
    #[serde(rename = "filesChanged")]
    pub files_changed: Vec<String>,

    /// Symbol names mentioned in the diff
    pub symbols: Vec<String>,

    /// One-line LLM summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(rename = "tokensUsed")]
    pub tokens_used: u64,

    #[serde(rename = "embeddingText")]
    pub embedding_text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

/// Compute the stable transcript chunk id for `(checkpoint_id, session_index)`.
pub fn transcript_id(checkpoint_id: &str, session_index: usize) -> String {
    truncated_sha256(&format!("{}:{}", checkpoint_id, session_index))
}

/// Truncated lowercase-hex SHA-256, the id scheme for all persisted records.
pub fn truncated_sha256(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(ID_LEN);
    hex
}

// ============================================================================
// Graph edges
// ============================================================================

/// Relationship kind between two symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// Caller -> callee
    Calls,
    /// File -> imported identifier's file/module
    Imports,
    /// Container -> member
    Contains,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Calls => "calls",
            EdgeType::Imports => "imports",
            EdgeType::Contains => "contains",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "calls" => Some(EdgeType::Calls),
            "imports" => Some(EdgeType::Imports),
            "contains" => Some(EdgeType::Contains),
            _ => None,
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted relationship between two symbols.
///
/// Edges with identical ids merge by summing `count` and keeping the latest
/// `last_modified`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// `source:target:edge_type`
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "edgeType")]
    pub edge_type: EdgeType,
    /// File the relationship was observed in
    #[serde(rename = "sourceFile")]
    pub source_file: String,
    /// Observation count, >= 1
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(rename = "lastModified")]
    pub last_modified: String,
}

impl GraphEdge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: EdgeType,
        source_file: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        let id = edge_id(&source, &target, edge_type);
        Self {
            id,
            source,
            target,
            edge_type,
            source_file: source_file.into(),
            count: 1,
            commit: None,
            last_modified: String::new(),
        }
    }
}

/// Compute the edge id for `(source, target, edge_type)`.
pub fn edge_id(source: &str, target: &str, edge_type: EdgeType) -> String {
    format!("{}:{}:{}", source, target, edge_type.as_str())
}

// ============================================================================
// Tests
// ============================================================================

//! Error types for yepmem-core

use thiserror::Error;

/// Errors that can occur during parsing and analysis.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Failed to set a tree-sitter language on the parser
    #[error("Failed to set language: {0}")]
    LanguageSet(String),

    /// Tree-sitter returned no tree for the source
    #[error("Failed to parse source code: {0}")]
    ParseFailed(String),

    /// IO error reading a source file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for yepmem-core operations
pub type Result<T> = std::result::Result<T, CoreError>;

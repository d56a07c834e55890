//! Multi-language symbol extraction.
//!
//! This module dispatches files by extension to per-language tree-sitter
//! walkers that emit one [`Symbol`] per top-level declaration plus one per
//! method and nested function. Extraction is purely syntactic: calls and
//! imports are recorded by name, never resolved across files.
//!
//! ## Supported Languages
//!
//! - TypeScript (.ts, .tsx)
//! - JavaScript (.js, .jsx, .mjs, .cjs)
//! - Python (.py)
//! - Go (.go)
//! - Rust (.rs)
//!
//! Any other extension parses to an empty symbol list.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use tree_sitter::{Language, Node, Parser};

use crate::error::{CoreError, Result};
use crate::model::Symbol;

mod go;
mod python;
mod rust_lang;
mod typescript;

// ============================================================================
// Supported Languages
// ============================================================================

/// Languages with a registered symbol extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedLanguage {
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
    Python,
    Go,
    Rust,
}

impl SupportedLanguage {
    /// Language tag recorded on chunks.
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedLanguage::TypeScript | SupportedLanguage::Tsx => "typescript",
            SupportedLanguage::JavaScript | SupportedLanguage::Jsx => "javascript",
            SupportedLanguage::Python => "python",
            SupportedLanguage::Go => "go",
            SupportedLanguage::Rust => "rust",
        }
    }

    /// Get the tree-sitter Language for this language.
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            SupportedLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SupportedLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            // The JSX dialect shares the JavaScript grammar
            SupportedLanguage::JavaScript | SupportedLanguage::Jsx => {
                tree_sitter_javascript::LANGUAGE.into()
            }
            SupportedLanguage::Python => tree_sitter_python::LANGUAGE.into(),
            SupportedLanguage::Go => tree_sitter_go::LANGUAGE.into(),
            SupportedLanguage::Rust => tree_sitter_rust::LANGUAGE.into(),
        }
    }

    /// Whether markup expressions are part of the dialect (component
    /// classification applies only here).
    pub fn has_jsx(&self) -> bool {
        matches!(self, SupportedLanguage::Tsx | SupportedLanguage::Jsx)
    }

    /// Detect language from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        extension_map().get(ext.to_lowercase().as_str()).copied()
    }

    /// Detect language from a file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for SupportedLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static EXTENSION_MAP: OnceLock<HashMap<&'static str, SupportedLanguage>> = OnceLock::new();

fn extension_map() -> &'static HashMap<&'static str, SupportedLanguage> {
    EXTENSION_MAP.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert("ts", SupportedLanguage::TypeScript);
        map.insert("tsx", SupportedLanguage::Tsx);
        map.insert("js", SupportedLanguage::JavaScript);
        map.insert("mjs", SupportedLanguage::JavaScript);
        map.insert("cjs", SupportedLanguage::JavaScript);
        map.insert("jsx", SupportedLanguage::Jsx);
        map.insert("py", SupportedLanguage::Python);
        map.insert("go", SupportedLanguage::Go);
        map.insert("rs", SupportedLanguage::Rust);
        map
    })
}

// ============================================================================
// Parser Registry
// ============================================================================

/// Dispatches files to per-language symbol extractors.
#[derive(Debug, Default)]
pub struct ParserRegistry;

impl ParserRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Whether the extension (without dot) has a registered parser.
    pub fn is_supported(&self, ext: &str) -> bool {
        SupportedLanguage::from_extension(ext).is_some()
    }

    /// All extensions with a registered parser.
    pub fn supported_extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "go", "rs"]
    }

    /// Parse a file from disk into symbols.
    ///
    /// Unsupported extensions and unparseable sources return an empty list;
    /// IO errors propagate.
    pub fn parse(&self, path: &Path) -> Result<Vec<Symbol>> {
        let Some(language) = SupportedLanguage::from_path(path) else {
            return Ok(Vec::new());
        };
        let source = std::fs::read_to_string(path)?;
        Ok(self.parse_source(&path.to_string_lossy(), &source, language))
    }

    /// Parse in-memory source for a known language.
    ///
    /// A source the grammar rejects outright yields an empty list; partial
    /// trees with error nodes still produce the symbols that did parse.
    pub fn parse_source(
        &self,
        path: &str,
        source: &str,
        language: SupportedLanguage,
    ) -> Vec<Symbol> {
        let tree = match parse_tree(source, language) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!("Skipping unparseable file {}: {}", path, e);
                return Vec::new();
            }
        };

        let root = tree.root_node();
        match language {
            SupportedLanguage::TypeScript
            | SupportedLanguage::Tsx
            | SupportedLanguage::JavaScript
            | SupportedLanguage::Jsx => typescript::extract(path, source, root, language),
            SupportedLanguage::Python => python::extract(path, source, root),
            SupportedLanguage::Go => go::extract(path, source, root),
            SupportedLanguage::Rust => rust_lang::extract(path, source, root),
        }
    }
}

fn parse_tree(source: &str, language: SupportedLanguage) -> Result<tree_sitter::Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&language.tree_sitter_language())
        .map_err(|e| CoreError::LanguageSet(e.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| CoreError::ParseFailed(language.as_str().to_string()))
}

// ============================================================================
// Shared walker helpers
// ============================================================================

/// UTF-8 text of a node, empty on invalid spans.
pub(crate) fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// 1-indexed line span of a node.
pub(crate) fn line_span(node: Node) -> (usize, usize) {
    (
        node.start_position().row + 1,
        node.end_position().row + 1,
    )
}

/// Append `value` unless already present (order-preserving dedup).
pub(crate) fn push_unique(values: &mut Vec<String>, value: String) {
    if !value.is_empty() && !values.contains(&value) {
        values.push(value);
    }
}

/// Collect the text of every identifier-like node in the subtree.
///
/// Used to decide which file-level imports a symbol body actually
/// references.
pub(crate) fn identifier_texts(node: Node, source: &str, out: &mut HashSet<String>) {
    let kind = node.kind();
    if kind.ends_with("identifier") || kind == "name" {
        out.insert(node_text(node, source).to_string());
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        identifier_texts(child, source, out);
    }
}

/// Filter file-level imports down to those referenced from the body.
pub(crate) fn referenced_imports(body: Node, source: &str, file_imports: &[String]) -> Vec<String> {
    if file_imports.is_empty() {
        return Vec::new();
    }
    let mut used = HashSet::new();
    identifier_texts(body, source, &mut used);
    file_imports
        .iter()
        .filter(|name| used.contains(*name))
        .cloned()
        .collect()
}

/// Whether any markup expression occurs in the subtree.
pub(crate) fn contains_jsx(node: Node) -> bool {
    matches!(
        node.kind(),
        "jsx_element" | "jsx_self_closing_element" | "jsx_fragment"
    ) || {
        let mut cursor = node.walk();
        let any_jsx = node.children(&mut cursor).any(contains_jsx);
        any_jsx
    }
}

/// Whether an identifier is PascalCase (leading uppercase, no snake).
pub(crate) fn is_pascal_case(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) && !name.contains('_')
}

/// Strip doc-comment markers from a raw comment block.
///
/// Handles `/** */` blocks, `///` and `//` line runs, and `#` line runs.
pub(crate) fn strip_comment_markers(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = if trimmed.starts_with("/**") {
        trimmed
            .trim_start_matches("/**")
            .trim_end_matches("*/")
            .lines()
            .map(|line| line.trim().trim_start_matches('*').trim())
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        trimmed
            .lines()
            .map(|line| {
                line.trim()
                    .trim_start_matches("///")
                    .trim_start_matches("//!")
                    .trim_start_matches("//")
                    .trim_start_matches('#')
                    .trim()
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    inner.trim().to_string()
}

/// Documentation comment immediately preceding `node`, if any.
///
/// Walks previous named siblings while they are comments, gathering a
/// contiguous run (line-comment style docs span several siblings).
pub(crate) fn doc_comment(node: Node, source: &str) -> Option<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut prev = node.prev_named_sibling();
    let mut expected_end = node.start_position().row;

    while let Some(sibling) = prev {
        if sibling.kind() != "comment" && sibling.kind() != "line_comment"
            && sibling.kind() != "block_comment"
        {
            break;
        }
        // Only accept comments directly attached to the declaration
        if sibling.end_position().row + 1 < expected_end {
            break;
        }
        lines.push(node_text(sibling, source).to_string());
        expected_end = sibling.start_position().row;
        // Block docs don't continue upward
        if node_text(sibling, source).starts_with("/*") {
            break;
        }
        prev = sibling.prev_named_sibling();
    }

    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    let doc = strip_comment_markers(&lines.join("\n"));
    if doc.is_empty() {
        None
    } else {
        Some(doc)
    }
}

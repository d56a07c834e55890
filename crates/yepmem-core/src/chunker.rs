//! Symbol-to-chunk conversion.
//!
//! Combines parsed symbols with file metadata into persistable
//! [`CodeChunk`] records and builds their embedding text. With a graph
//! snapshot available the text is enriched with signature, caller/callee
//! context, and modifier flags; without one it falls back to the plain
//! `type name / doc / body` form.

use std::path::Path;

use crate::error::Result;
use crate::graph::SymbolGraph;
use crate::model::{chunk_id, CodeChunk, Symbol};
use crate::parser::{ParserRegistry, SupportedLanguage};

/// Embedding text is capped at this many characters.
const MAX_EMBEDDING_TEXT: usize = 2048;

/// Callers/callees included in enriched text.
const GRAPH_CONTEXT_TOP_K: usize = 5;

/// Parse a file and convert its symbols to chunks.
pub fn chunk_file_symbols(
    registry: &ParserRegistry,
    path: &Path,
    relative_path: &str,
    last_modified: &str,
    commit: Option<&str>,
    graph: Option<&SymbolGraph>,
) -> Result<Vec<CodeChunk>> {
    let Some(language) = SupportedLanguage::from_path(path) else {
        return Ok(Vec::new());
    };
    let source = std::fs::read_to_string(path)?;
    let symbols = registry.parse_source(relative_path, &source, language);
    Ok(chunk_symbols(
        symbols,
        language.as_str(),
        last_modified,
        commit,
        graph,
    ))
}

/// Convert already-parsed symbols to chunks.
pub fn chunk_symbols(
    symbols: Vec<Symbol>,
    language: &str,
    last_modified: &str,
    commit: Option<&str>,
    graph: Option<&SymbolGraph>,
) -> Vec<CodeChunk> {
    symbols
        .into_iter()
        .map(|symbol| {
            let id = chunk_id(&symbol.path, &symbol.name, symbol.start_line);
            let embedding_text = build_embedding_text(&symbol, graph);
            CodeChunk {
                id,
                symbol,
                language: language.to_string(),
                last_modified: last_modified.to_string(),
                commit: commit.map(|c| c.to_string()),
                summary: None,
                embedding_text,
                embedding: Vec::new(),
            }
        })
        .collect()
}

/// Build embedding text for one symbol.
///
/// The enriched form is used whenever a non-empty graph is supplied.
pub fn build_embedding_text(symbol: &Symbol, graph: Option<&SymbolGraph>) -> String {
    match graph {
        Some(graph) if !graph.is_empty() => enriched_text(symbol, graph),
        _ => simple_text(symbol),
    }
}

fn simple_text(symbol: &Symbol) -> String {
    let mut text = format!("{} {}", symbol.symbol_type, symbol.name);
    if let Some(doc) = &symbol.doc {
        text.push('\n');
        text.push_str(doc);
    }
    text.push('\n');
    text.push_str(&symbol.body);
    truncate_chars(text, MAX_EMBEDDING_TEXT)
}

fn enriched_text(symbol: &Symbol, graph: &SymbolGraph) -> String {
    let mut sections = Vec::new();

    if let Some(signature) = signature_line(symbol) {
        sections.push(signature);
    }

    sections.push(simple_text(symbol));

    let callers = graph.callers(&symbol.name);
    if !callers.is_empty() {
        let names: Vec<&str> = callers
            .iter()
            .take(GRAPH_CONTEXT_TOP_K)
            .map(|(name, _)| name.as_str())
            .collect();
        sections.push(format!("used by: {}", names.join(", ")));
    }

    let callees = graph.callees(&symbol.name);
    if !callees.is_empty() {
        let names: Vec<&str> = callees
            .iter()
            .take(GRAPH_CONTEXT_TOP_K)
            .map(|(name, _)| name.as_str())
            .collect();
        sections.push(format!("calls: {}", names.join(", ")));
    }

    let flags = flag_line(symbol);
    if !flags.is_empty() {
        sections.push(flags);
    }

    truncate_chars(sections.join("\n"), MAX_EMBEDDING_TEXT)
}

/// `signature: <return_type> <name>(<params>)` when the metadata carries a
/// signature.
fn signature_line(symbol: &Symbol) -> Option<String> {
    let meta = &symbol.metadata;
    if meta.return_type.is_none() && meta.parameters.is_none() {
        return None;
    }
    let params = meta
        .parameters
        .as_ref()
        .map(|p| p.join(", "))
        .unwrap_or_default();
    let ret = meta.return_type.as_deref().unwrap_or("");
    Some(
        format!("signature: {} {}({})", ret, symbol.name, params)
            .replace("signature:  ", "signature: "),
    )
}

fn flag_line(symbol: &Symbol) -> String {
    let mut flags = Vec::new();
    if symbol.metadata.is_async == Some(true) {
        flags.push("async");
    }
    if symbol.metadata.is_exported == Some(true) {
        flags.push("exported");
    }
    match symbol.metadata.visibility.as_deref() {
        Some("public") => flags.push("public"),
        Some("private") => flags.push("private"),
        _ => {}
    }
    flags.join(" ")
}

fn truncate_chars(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        return text;
    }
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeType, GraphEdge, SymbolMetadata, SymbolType};

    fn symbol(name: &str) -> Symbol {
        Symbol {
            name: name.to_string(),
            symbol_type: SymbolType::Function,
            path: "src/app.ts".to_string(),
            start_line: 1,
            end_line: 3,
            body: format!("function {}() {{}}", name),
            doc: Some("Does a thing.".to_string()),
            calls: vec![],
            imports: vec![],
            metadata: SymbolMetadata::default(),
        }
    }

    #[test]
    fn simple_text_shape() {
        let text = build_embedding_text(&symbol("greet"), None);
        assert!(text.starts_with("function greet\nDoes a thing.\n"));
        assert!(text.contains("function greet() {}"));
    }

    #[test]
    fn chunk_ids_are_stable() {
        let chunks = chunk_symbols(vec![symbol("greet")], "typescript", "2026-01-01", None, None);
        let again = chunk_symbols(vec![symbol("greet")], "typescript", "2026-01-02", None, None);
        assert_eq!(chunks[0].id, again[0].id);
        assert_eq!(chunks[0].language, "typescript");
    }

    #[test]
    fn enriched_text_includes_graph_context() {
        let graph = SymbolGraph::from_edges(vec![
            GraphEdge::new("caller_one", "greet", EdgeType::Calls, "src/a.ts"),
            GraphEdge::new("caller_two", "greet", EdgeType::Calls, "src/b.ts"),
            GraphEdge::new("greet", "format", EdgeType::Calls, "src/app.ts"),
        ]);

        let mut sym = symbol("greet");
        sym.metadata.is_async = Some(true);
        sym.metadata.is_exported = Some(true);
        sym.metadata.parameters = Some(vec!["name: string".to_string()]);
        sym.metadata.return_type = Some("string".to_string());

        let text = build_embedding_text(&sym, Some(&graph));
        assert!(text.starts_with("signature: string greet(name: string)"));
        assert!(text.contains("used by: caller_one, caller_two"));
        assert!(text.contains("calls: format"));
        assert!(text.ends_with("async exported"));
    }

    #[test]
    fn caller_context_caps_at_five() {
        let edges: Vec<GraphEdge> = (0..8)
            .map(|i| {
                GraphEdge::new(format!("caller{}", i), "greet", EdgeType::Calls, "src/a.ts")
            })
            .collect();
        let graph = SymbolGraph::from_edges(edges);

        let text = build_embedding_text(&symbol("greet"), Some(&graph));
        let used_by = text
            .lines()
            .find(|l| l.starts_with("used by:"))
            .expect("used by line");
        assert_eq!(used_by.matches("caller").count(), 5);
    }

    #[test]
    fn embedding_text_is_capped() {
        let mut sym = symbol("big");
        sym.body = "x".repeat(5000);
        let text = build_embedding_text(&sym, None);
        assert_eq!(text.chars().count(), 2048);
    }

    #[test]
    fn empty_graph_falls_back_to_simple() {
        let graph = SymbolGraph::new();
        let text = build_embedding_text(&symbol("greet"), Some(&graph));
        assert!(text.starts_with("function greet"));
    }
}

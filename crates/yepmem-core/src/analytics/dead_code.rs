//! Dead code detection.
//!
//! A symbol is reported dead when nothing calls it, nothing imports its
//! file, and it is not an entry point (`main`, default exports,
//! components). Call resolution is name-based, so a dynamic-dispatch-heavy
//! codebase will over-report; results are a review queue, not a delete
//! list.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::graph::SymbolGraph;
use crate::model::CodeChunk;

/// One unreferenced symbol.
#[derive(Debug, Clone, Serialize)]
pub struct DeadCodeItem {
    pub symbol: String,
    pub path: String,
    #[serde(rename = "startLine")]
    pub start_line: usize,
    #[serde(rename = "symbolType")]
    pub symbol_type: String,
}

/// Find symbols with no callers whose file has no importers.
pub fn find_dead_code(chunks: &[CodeChunk], graph: &SymbolGraph) -> Vec<DeadCodeItem> {
    // Names defined per file, to answer "does anything import this file"
    let mut names_by_path: HashMap<&str, HashSet<&str>> = HashMap::new();
    for chunk in chunks {
        names_by_path
            .entry(chunk.symbol.path.as_str())
            .or_default()
            .insert(chunk.symbol.name.as_str());
    }

    let mut imported_paths: HashSet<&str> = HashSet::new();
    for (path, names) in &names_by_path {
        let imported = names
            .iter()
            .any(|name| graph.importer_count(name) > 0)
            || graph.importer_count(path) > 0;
        if imported {
            imported_paths.insert(path);
        }
    }

    let mut dead: Vec<DeadCodeItem> = chunks
        .iter()
        .filter(|chunk| {
            let symbol = &chunk.symbol;
            !symbol.is_entry_point()
                && graph.caller_count(&symbol.name) == 0
                && !imported_paths.contains(symbol.path.as_str())
        })
        .map(|chunk| DeadCodeItem {
            symbol: chunk.symbol.name.clone(),
            path: chunk.symbol.path.clone(),
            start_line: chunk.symbol.start_line,
            symbol_type: chunk.symbol.symbol_type.as_str().to_string(),
        })
        .collect();

    dead.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.start_line.cmp(&b.start_line)));
    dead
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::chunk_symbols;
    use crate::model::{EdgeType, GraphEdge, Symbol, SymbolMetadata, SymbolType};

    fn symbol(name: &str, path: &str, symbol_type: SymbolType) -> Symbol {
        Symbol {
            name: name.to_string(),
            symbol_type,
            path: path.to_string(),
            start_line: 1,
            end_line: 2,
            body: String::new(),
            doc: None,
            calls: vec![],
            imports: vec![],
            metadata: SymbolMetadata::default(),
        }
    }

    fn chunks_of(symbols: Vec<Symbol>) -> Vec<CodeChunk> {
        chunk_symbols(symbols, "typescript", "2026-01-01", None, None)
    }

    #[test]
    fn uncalled_symbol_is_dead() {
        let chunks = chunks_of(vec![
            symbol("used", "src/a.ts", SymbolType::Function),
            symbol("orphan", "src/b.ts", SymbolType::Function),
        ]);
        let graph = SymbolGraph::from_edges(vec![GraphEdge::new(
            "caller", "used", EdgeType::Calls, "src/c.ts",
        )]);

        let dead = find_dead_code(&chunks, &graph);
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].symbol, "orphan");
    }

    #[test]
    fn imported_file_shields_its_symbols() {
        let chunks = chunks_of(vec![symbol("helper", "src/util.ts", SymbolType::Function)]);
        let graph = SymbolGraph::from_edges(vec![GraphEdge::new(
            "src/a.ts", "helper", EdgeType::Imports, "src/a.ts",
        )]);

        assert!(find_dead_code(&chunks, &graph).is_empty());
    }

    #[test]
    fn entry_points_are_never_dead() {
        let chunks = chunks_of(vec![
            symbol("main", "src/main.rs", SymbolType::Function),
            symbol("App", "src/App.tsx", SymbolType::Component),
        ]);
        let graph = SymbolGraph::new();

        assert!(find_dead_code(&chunks, &graph).is_empty());
    }
}

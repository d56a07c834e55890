//! Per-directory aggregate insights.

use std::collections::HashMap;

use serde::Serialize;

use crate::graph::SymbolGraph;
use crate::model::CodeChunk;

use super::complexity::cyclomatic_complexity;
use super::dead_code::find_dead_code;

/// Aggregates for one top-level directory.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryInsight {
    pub directory: String,
    #[serde(rename = "symbolCount")]
    pub symbol_count: usize,
    #[serde(rename = "avgComplexity")]
    pub avg_complexity: f64,
    #[serde(rename = "deadCodeCount")]
    pub dead_code_count: usize,
    /// Fraction of symbols carrying a doc comment
    #[serde(rename = "docCoverage")]
    pub doc_coverage: f64,
    /// Highest-PageRank symbol in the directory
    #[serde(rename = "topSymbol", skip_serializing_if = "Option::is_none")]
    pub top_symbol: Option<String>,
}

/// Aggregate chunks per top-level directory.
pub fn directory_insights(
    chunks: &[CodeChunk],
    graph: &SymbolGraph,
    pagerank: &HashMap<String, f64>,
) -> Vec<DirectoryInsight> {
    let dead = find_dead_code(chunks, graph);
    let mut dead_by_dir: HashMap<String, usize> = HashMap::new();
    for item in &dead {
        *dead_by_dir.entry(top_level_dir(&item.path)).or_default() += 1;
    }

    let mut grouped: HashMap<String, Vec<&CodeChunk>> = HashMap::new();
    for chunk in chunks {
        grouped
            .entry(top_level_dir(&chunk.symbol.path))
            .or_default()
            .push(chunk);
    }

    let mut insights: Vec<DirectoryInsight> = grouped
        .into_iter()
        .map(|(directory, members)| {
            let symbol_count = members.len();
            let total_complexity: usize = members
                .iter()
                .map(|c| cyclomatic_complexity(&c.symbol.body))
                .sum();
            let documented = members.iter().filter(|c| c.symbol.doc.is_some()).count();

            let top_symbol = members
                .iter()
                .filter_map(|c| {
                    pagerank
                        .get(&c.symbol.name)
                        .map(|score| (c.symbol.name.as_str(), *score))
                })
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(name, _)| name.to_string());

            DirectoryInsight {
                dead_code_count: dead_by_dir.get(&directory).copied().unwrap_or(0),
                avg_complexity: total_complexity as f64 / symbol_count as f64,
                doc_coverage: documented as f64 / symbol_count as f64,
                symbol_count,
                top_symbol,
                directory,
            }
        })
        .collect();

    insights.sort_by(|a, b| b.symbol_count.cmp(&a.symbol_count));
    insights
}

/// First path component, or "." for bare filenames.
fn top_level_dir(path: &str) -> String {
    match path.split('/').next() {
        Some(first) if first != path => first.to_string(),
        _ => ".".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::chunk_symbols;
    use crate::model::{Symbol, SymbolMetadata, SymbolType};

    fn symbol(name: &str, path: &str, doc: Option<&str>) -> Symbol {
        Symbol {
            name: name.to_string(),
            symbol_type: SymbolType::Function,
            path: path.to_string(),
            start_line: 1,
            end_line: 2,
            body: "function f() { if (a) { g(); } }".to_string(),
            doc: doc.map(|d| d.to_string()),
            calls: vec![],
            imports: vec![],
            metadata: SymbolMetadata::default(),
        }
    }

    #[test]
    fn groups_by_top_level_directory() {
        let chunks = chunk_symbols(
            vec![
                symbol("a", "src/a.ts", Some("doc")),
                symbol("b", "src/sub/b.ts", None),
                symbol("c", "lib/c.ts", None),
            ],
            "typescript",
            "2026-01-01",
            None,
            None,
        );
        let graph = SymbolGraph::new();
        let ranks = HashMap::from([("a".to_string(), 1.0), ("b".to_string(), 0.4)]);

        let insights = directory_insights(&chunks, &graph, &ranks);
        assert_eq!(insights.len(), 2);

        let src = insights.iter().find(|i| i.directory == "src").unwrap();
        assert_eq!(src.symbol_count, 2);
        assert!((src.doc_coverage - 0.5).abs() < 1e-9);
        assert_eq!(src.top_symbol.as_deref(), Some("a"));
        assert!(src.avg_complexity >= 2.0);
    }

    #[test]
    fn bare_filenames_group_under_dot() {
        assert_eq!(top_level_dir("main.rs"), ".");
        assert_eq!(top_level_dir("src/main.rs"), "src");
    }
}

//! In-memory symbol graph.
//!
//! Nodes are symbol names (or file paths for import edges); edges carry the
//! persisted [`GraphEdge`] record. Inserts merge by edge id, so replaying a
//! batch or inserting in any order converges to the same counts.
//!
//! Cross-file resolution is by name only. Two different functions that share
//! a name share a node; consumers must treat edge targets as approximate.

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::model::{CodeChunk, EdgeType, GraphEdge};

/// Directed symbol graph with merge-on-insert edge semantics.
#[derive(Debug, Default)]
pub struct SymbolGraph {
    graph: StableGraph<String, GraphEdge>,
    nodes: HashMap<String, NodeIndex>,
    edges: HashMap<String, petgraph::stable_graph::EdgeIndex>,
}

impl SymbolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from an edge batch.
    pub fn from_edges(edges: Vec<GraphEdge>) -> Self {
        let mut graph = Self::new();
        graph.insert_edges(edges);
        graph
    }

    fn node_index(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.nodes.get(name) {
            return *idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.nodes.insert(name.to_string(), idx);
        idx
    }

    /// Insert a batch of edges, merging duplicates by id.
    ///
    /// Merge policy: `count += incoming.count`, `last_modified = max`.
    pub fn insert_edges(&mut self, batch: Vec<GraphEdge>) {
        for edge in batch {
            if let Some(existing_idx) = self.edges.get(&edge.id) {
                if let Some(existing) = self.graph.edge_weight_mut(*existing_idx) {
                    existing.count += edge.count;
                    if edge.last_modified > existing.last_modified {
                        existing.last_modified = edge.last_modified;
                    }
                    if edge.commit.is_some() {
                        existing.commit = edge.commit;
                    }
                }
                continue;
            }
            let source = self.node_index(&edge.source);
            let target = self.node_index(&edge.target);
            let id = edge.id.clone();
            let edge_idx = self.graph.add_edge(source, target, edge);
            self.edges.insert(id, edge_idx);
        }
    }

    /// Edges pointing at `target`.
    pub fn incoming(&self, target: &str) -> Vec<&GraphEdge> {
        let Some(idx) = self.nodes.get(target) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(*idx, Direction::Incoming)
            .map(|e| e.weight())
            .collect()
    }

    /// Edges leaving `source`.
    pub fn outgoing(&self, source: &str) -> Vec<&GraphEdge> {
        let Some(idx) = self.nodes.get(source) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(*idx, Direction::Outgoing)
            .map(|e| e.weight())
            .collect()
    }

    /// Number of distinct callers of `symbol`.
    pub fn caller_count(&self, symbol: &str) -> usize {
        self.incoming(symbol)
            .iter()
            .filter(|e| e.edge_type == EdgeType::Calls)
            .count()
    }

    /// Callers of `symbol` with observation counts, ordered by count
    /// descending then source name.
    pub fn callers(&self, symbol: &str) -> Vec<(String, u64)> {
        let mut callers: Vec<(String, u64)> = self
            .incoming(symbol)
            .iter()
            .filter(|e| e.edge_type == EdgeType::Calls)
            .map(|e| (e.source.clone(), e.count))
            .collect();
        callers.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        callers
    }

    /// Callees of `symbol`, ordered by count descending then target name.
    pub fn callees(&self, symbol: &str) -> Vec<(String, u64)> {
        let mut callees: Vec<(String, u64)> = self
            .outgoing(symbol)
            .iter()
            .filter(|e| e.edge_type == EdgeType::Calls)
            .map(|e| (e.target.clone(), e.count))
            .collect();
        callees.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        callees
    }

    /// Number of import edges targeting `name`.
    pub fn importer_count(&self, name: &str) -> usize {
        self.incoming(name)
            .iter()
            .filter(|e| e.edge_type == EdgeType::Imports)
            .count()
    }

    /// All node names, unordered.
    pub fn all_symbols(&self) -> Vec<&str> {
        self.graph.node_weights().map(|n| n.as_str()).collect()
    }

    /// All edges, unordered.
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.graph.edge_weights()
    }

    /// Outgoing neighbor indices for the PageRank walk.
    pub(crate) fn neighbor_indices(&self) -> (Vec<&str>, Vec<Vec<usize>>) {
        let indices: Vec<NodeIndex> = self.graph.node_indices().collect();
        let position: HashMap<NodeIndex, usize> = indices
            .iter()
            .enumerate()
            .map(|(pos, idx)| (*idx, pos))
            .collect();

        let names: Vec<&str> = indices
            .iter()
            .map(|idx| self.graph[*idx].as_str())
            .collect();
        let neighbors: Vec<Vec<usize>> = indices
            .iter()
            .map(|idx| {
                self.graph
                    .edges_directed(*idx, Direction::Outgoing)
                    .map(|e| position[&e.target()])
                    .collect()
            })
            .collect();

        (names, neighbors)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.nodes.clear();
        self.edges.clear();
    }
}

/// Derive the full edge batch for a set of chunks.
///
/// - `calls`: symbol -> callee, one per distinct callee per symbol
/// - `imports`: file path -> imported identifier
/// - `contains`: `Class` -> `Class.method` for dotted names
pub fn derive_edges(chunks: &[CodeChunk]) -> Vec<GraphEdge> {
    let mut edges: Vec<GraphEdge> = Vec::new();

    for chunk in chunks {
        let symbol = &chunk.symbol;
        let stamp = chunk.last_modified.clone();

        for callee in &symbol.calls {
            if callee == &symbol.name {
                continue;
            }
            let mut edge = GraphEdge::new(
                symbol.name.clone(),
                callee.clone(),
                EdgeType::Calls,
                symbol.path.clone(),
            );
            edge.last_modified = stamp.clone();
            edge.commit = chunk.commit.clone();
            edges.push(edge);
        }

        for import in &symbol.imports {
            let mut edge = GraphEdge::new(
                symbol.path.clone(),
                import.clone(),
                EdgeType::Imports,
                symbol.path.clone(),
            );
            edge.last_modified = stamp.clone();
            edge.commit = chunk.commit.clone();
            edges.push(edge);
        }

        if let Some((container, _)) = symbol.name.rsplit_once('.') {
            let mut edge = GraphEdge::new(
                container.to_string(),
                symbol.name.clone(),
                EdgeType::Contains,
                symbol.path.clone(),
            );
            edge.last_modified = stamp;
            edge.commit = chunk.commit.clone();
            edges.push(edge);
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &str, target: &str, edge_type: EdgeType) -> GraphEdge {
        GraphEdge::new(source, target, edge_type, "src/a.ts")
    }

    #[test]
    fn insert_and_query() {
        let mut graph = SymbolGraph::new();
        graph.insert_edges(vec![
            edge("a", "b", EdgeType::Calls),
            edge("c", "b", EdgeType::Calls),
            edge("src/a.ts", "b", EdgeType::Imports),
        ]);

        assert_eq!(graph.caller_count("b"), 2);
        assert_eq!(graph.importer_count("b"), 1);
        assert_eq!(graph.outgoing("a").len(), 1);
        assert_eq!(graph.incoming("b").len(), 3);
    }

    #[test]
    fn merge_sums_counts() {
        let mut graph = SymbolGraph::new();
        graph.insert_edges(vec![edge("a", "b", EdgeType::Calls)]);
        graph.insert_edges(vec![edge("a", "b", EdgeType::Calls)]);

        let incoming = graph.incoming("b");
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].count, 2);
    }

    #[test]
    fn merge_is_commutative() {
        let batch = vec![
            edge("a", "b", EdgeType::Calls),
            edge("b", "c", EdgeType::Calls),
            edge("a", "b", EdgeType::Calls),
            edge("a", "c", EdgeType::Imports),
        ];

        let forward = SymbolGraph::from_edges(batch.clone());
        let mut reversed_batch = batch;
        reversed_batch.reverse();
        let reversed = SymbolGraph::from_edges(reversed_batch);

        for e in forward.edges() {
            let matching = reversed
                .edges()
                .find(|r| r.id == e.id)
                .expect("edge present in both orders");
            assert_eq!(matching.count, e.count);
        }
        assert_eq!(forward.edge_count(), reversed.edge_count());
    }

    #[test]
    fn callers_ordered_by_count_then_name() {
        let mut graph = SymbolGraph::new();
        let mut heavy = edge("z", "t", EdgeType::Calls);
        heavy.count = 5;
        graph.insert_edges(vec![
            edge("b", "t", EdgeType::Calls),
            edge("a", "t", EdgeType::Calls),
            heavy,
        ]);

        let callers = graph.callers("t");
        assert_eq!(
            callers,
            vec![
                ("z".to_string(), 5),
                ("a".to_string(), 1),
                ("b".to_string(), 1)
            ]
        );
    }

    #[test]
    fn clear_empties_everything() {
        let mut graph = SymbolGraph::new();
        graph.insert_edges(vec![edge("a", "b", EdgeType::Calls)]);
        graph.clear();
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.incoming("b").is_empty());
    }
}

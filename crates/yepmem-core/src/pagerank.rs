//! PageRank centrality over the symbol graph.
//!
//! Damped power iteration with uniform edge weights: every outgoing edge
//! receives an equal share of its node's rank regardless of observation
//! count. Dangling nodes redistribute their rank uniformly.

use std::collections::HashMap;

use crate::graph::SymbolGraph;

/// Damping factor.
const DAMPING: f64 = 0.85;
/// Convergence threshold on the L1 delta between iterations.
const EPSILON: f64 = 1e-6;
/// Iteration cap.
const MAX_ITERATIONS: usize = 100;

/// Raw PageRank scores; the returned map sums to ~1.
pub fn pagerank(graph: &SymbolGraph) -> HashMap<String, f64> {
    let (names, neighbors) = graph.neighbor_indices();
    let n = names.len();
    if n == 0 {
        return HashMap::new();
    }

    let uniform = 1.0 / n as f64;
    let mut ranks = vec![uniform; n];
    let mut next = vec![0.0; n];

    for _ in 0..MAX_ITERATIONS {
        let base = (1.0 - DAMPING) / n as f64;
        next.iter_mut().for_each(|r| *r = base);

        // Dangling nodes spread their rank across everyone
        let dangling_mass: f64 = (0..n)
            .filter(|i| neighbors[*i].is_empty())
            .map(|i| ranks[i])
            .sum();
        let dangling_share = DAMPING * dangling_mass / n as f64;
        next.iter_mut().for_each(|r| *r += dangling_share);

        for (i, out) in neighbors.iter().enumerate() {
            if out.is_empty() {
                continue;
            }
            let share = DAMPING * ranks[i] / out.len() as f64;
            for target in out {
                next[*target] += share;
            }
        }

        let delta: f64 = ranks
            .iter()
            .zip(next.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        std::mem::swap(&mut ranks, &mut next);

        if delta < EPSILON {
            break;
        }
    }

    names
        .into_iter()
        .zip(ranks)
        .map(|(name, rank)| (name.to_string(), rank))
        .collect()
}

/// PageRank rescaled to (0, 1] by the maximum score.
pub fn normalized_pagerank(graph: &SymbolGraph) -> HashMap<String, f64> {
    let mut scores = pagerank(graph);
    let max = scores.values().cloned().fold(0.0f64, f64::max);
    if max > 0.0 {
        for score in scores.values_mut() {
            *score /= max;
        }
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeType, GraphEdge};

    fn chain_graph() -> SymbolGraph {
        SymbolGraph::from_edges(vec![
            GraphEdge::new("a", "b", EdgeType::Calls, "f"),
            GraphEdge::new("b", "c", EdgeType::Calls, "f"),
            GraphEdge::new("c", "a", EdgeType::Calls, "f"),
        ])
    }

    #[test]
    fn scores_sum_to_one() {
        let scores = pagerank(&chain_graph());
        let total: f64 = scores.values().sum();
        assert!((total - 1.0).abs() < 1e-3, "sum was {}", total);
    }

    #[test]
    fn symmetric_cycle_is_uniform() {
        let scores = pagerank(&chain_graph());
        for score in scores.values() {
            assert!((score - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn hub_outranks_leaves() {
        let graph = SymbolGraph::from_edges(vec![
            GraphEdge::new("a", "hub", EdgeType::Calls, "f"),
            GraphEdge::new("b", "hub", EdgeType::Calls, "f"),
            GraphEdge::new("c", "hub", EdgeType::Calls, "f"),
        ]);
        let scores = pagerank(&graph);
        assert!(scores["hub"] > scores["a"]);
        assert!(scores["hub"] > scores["b"]);
    }

    #[test]
    fn dangling_nodes_conserve_mass() {
        // hub has no outgoing edges at all
        let graph = SymbolGraph::from_edges(vec![
            GraphEdge::new("a", "hub", EdgeType::Calls, "f"),
            GraphEdge::new("b", "hub", EdgeType::Calls, "f"),
        ]);
        let scores = pagerank(&graph);
        let total: f64 = scores.values().sum();
        assert!((total - 1.0).abs() < 1e-3);
    }

    #[test]
    fn normalized_max_is_one() {
        let scores = normalized_pagerank(&chain_graph());
        let max = scores.values().cloned().fold(0.0f64, f64::max);
        assert!((max - 1.0).abs() < 1e-9);
        assert!(scores.values().all(|s| *s > 0.0 && *s <= 1.0));
    }

    #[test]
    fn empty_graph_is_empty() {
        assert!(pagerank(&SymbolGraph::new()).is_empty());
    }
}

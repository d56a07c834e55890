//! Duplicate detection via MinHash.
//!
//! Bodies are tokenized, shingled into runs of 5 tokens, and hashed into a
//! 128-slot MinHash signature. Signature agreement estimates Jaccard
//! similarity; symbols at or above 0.75 cluster transitively. Shingle size
//! and signature length are fixed so different runs produce comparable
//! signatures.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::model::CodeChunk;
use crate::text::tokenize;

/// Tokens per shingle.
const SHINGLE_SIZE: usize = 5;
/// Hash functions in the signature.
const SIGNATURE_LEN: usize = 128;
/// Estimated Jaccard threshold for clustering.
const SIMILARITY_THRESHOLD: f64 = 0.75;

/// A group of near-identical symbols.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateCluster {
    /// `(symbol, path)` members, at least two
    pub members: Vec<(String, String)>,
    /// Mean pairwise estimated Jaccard within the cluster
    pub similarity: f64,
}

/// Cluster chunks whose bodies are near-duplicates.
pub fn find_duplicate_clusters(chunks: &[CodeChunk]) -> Vec<DuplicateCluster> {
    let signatures: Vec<(usize, [u64; SIGNATURE_LEN])> = chunks
        .iter()
        .enumerate()
        .filter_map(|(i, chunk)| minhash_signature(&chunk.symbol.body).map(|sig| (i, sig)))
        .collect();

    // Union-find over pairs at or above the threshold
    let mut parent: Vec<usize> = (0..signatures.len()).collect();
    fn find(parent: &mut Vec<usize>, i: usize) -> usize {
        if parent[i] != i {
            let root = find(parent, parent[i]);
            parent[i] = root;
        }
        parent[i]
    }

    let mut pair_sims: Vec<(usize, usize, f64)> = Vec::new();
    for a in 0..signatures.len() {
        for b in (a + 1)..signatures.len() {
            let sim = signature_similarity(&signatures[a].1, &signatures[b].1);
            if sim >= SIMILARITY_THRESHOLD {
                pair_sims.push((a, b, sim));
                let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
                if ra != rb {
                    parent[rb] = ra;
                }
            }
        }
    }

    let mut clusters: std::collections::HashMap<usize, Vec<usize>> =
        std::collections::HashMap::new();
    for i in 0..signatures.len() {
        let root = find(&mut parent, i);
        clusters.entry(root).or_default().push(i);
    }

    let mut out: Vec<DuplicateCluster> = clusters
        .into_values()
        .filter(|members| members.len() >= 2)
        .map(|members| {
            let member_set: std::collections::HashSet<usize> = members.iter().copied().collect();
            let sims: Vec<f64> = pair_sims
                .iter()
                .filter(|(a, b, _)| member_set.contains(a) && member_set.contains(b))
                .map(|(_, _, sim)| *sim)
                .collect();
            let similarity = if sims.is_empty() {
                SIMILARITY_THRESHOLD
            } else {
                sims.iter().sum::<f64>() / sims.len() as f64
            };

            let mut named: Vec<(String, String)> = members
                .iter()
                .map(|i| {
                    let chunk = &chunks[signatures[*i].0];
                    (chunk.symbol.name.clone(), chunk.symbol.path.clone())
                })
                .collect();
            named.sort();

            DuplicateCluster {
                members: named,
                similarity,
            }
        })
        .collect();

    out.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out
}

/// MinHash signature of a body; None when too short to shingle.
fn minhash_signature(body: &str) -> Option<[u64; SIGNATURE_LEN]> {
    let tokens = tokenize(body);
    if tokens.len() < SHINGLE_SIZE {
        return None;
    }

    let mut signature = [u64::MAX; SIGNATURE_LEN];
    for window in tokens.windows(SHINGLE_SIZE) {
        let base = {
            let mut hasher = DefaultHasher::new();
            window.hash(&mut hasher);
            hasher.finish()
        };
        for (seed, slot) in signature.iter_mut().enumerate() {
            // Cheap per-seed permutation of the base hash
            let mut hasher = DefaultHasher::new();
            (seed as u64).hash(&mut hasher);
            base.hash(&mut hasher);
            let h = hasher.finish();
            if h < *slot {
                *slot = h;
            }
        }
    }
    Some(signature)
}

/// Fraction of agreeing signature slots, an estimator of Jaccard.
fn signature_similarity(a: &[u64; SIGNATURE_LEN], b: &[u64; SIGNATURE_LEN]) -> f64 {
    let matches = a.iter().zip(b.iter()).filter(|(x, y)| x == y).count();
    matches as f64 / SIGNATURE_LEN as f64
}

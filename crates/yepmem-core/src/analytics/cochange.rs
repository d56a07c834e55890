//! Co-change mining over version-control history.
//!
//! Files that repeatedly appear in the same commits have change affinity.
//! For every ordered file pair: `support = cooccurrences / commits` and
//! `confidence = cooccurrences / occurrences(first file)`. Pairs clearing
//! both thresholds are reported, strongest confidence first.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Minimum share of all commits the pair must appear in together.
const MIN_SUPPORT: f64 = 0.01;
/// Minimum conditional probability of the second file given the first.
const MIN_CONFIDENCE: f64 = 0.3;

/// One commit reduced to its touched files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitFiles {
    pub sha: String,
    /// Author timestamp, RFC 3339
    pub timestamp: String,
    pub files: Vec<String>,
}

/// A mined file-affinity pair (directional).
#[derive(Debug, Clone, Serialize)]
pub struct CoChangePair {
    pub file_a: String,
    pub file_b: String,
    pub support: f64,
    pub confidence: f64,
    pub cooccurrences: usize,
}

/// Mine co-change pairs from a commit window.
pub fn mine_cochange(commits: &[CommitFiles]) -> Vec<CoChangePair> {
    if commits.is_empty() {
        return Vec::new();
    }
    let total = commits.len() as f64;

    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    let mut cooccurrences: HashMap<(&str, &str), usize> = HashMap::new();

    for commit in commits {
        let mut files: Vec<&str> = commit.files.iter().map(String::as_str).collect();
        files.sort_unstable();
        files.dedup();

        for file in &files {
            *occurrences.entry(file).or_default() += 1;
        }
        for i in 0..files.len() {
            for j in (i + 1)..files.len() {
                *cooccurrences.entry((files[i], files[j])).or_default() += 1;
            }
        }
    }

    let mut pairs = Vec::new();
    for ((a, b), together) in &cooccurrences {
        let support = *together as f64 / total;
        if support < MIN_SUPPORT {
            continue;
        }
        for (first, second) in [(a, b), (b, a)] {
            let confidence = *together as f64 / occurrences[*first] as f64;
            if confidence >= MIN_CONFIDENCE {
                pairs.push(CoChangePair {
                    file_a: (*first).to_string(),
                    file_b: (*second).to_string(),
                    support,
                    confidence,
                    cooccurrences: *together,
                });
            }
        }
    }

    pairs.sort_by(|x, y| {
        y.confidence
            .partial_cmp(&x.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| x.file_a.cmp(&y.file_a))
            .then_with(|| x.file_b.cmp(&y.file_b))
    });
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(sha: &str, files: &[&str]) -> CommitFiles {
        CommitFiles {
            sha: sha.to_string(),
            timestamp: "2026-07-01T00:00:00Z".to_string(),
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn support_and_confidence() {
        // 3 commits touch {A, B}, 1 commit touches {A} alone
        let commits = vec![
            commit("c1", &["A", "B"]),
            commit("c2", &["A", "B"]),
            commit("c3", &["A", "B"]),
            commit("c4", &["A"]),
        ];
        let pairs = mine_cochange(&commits);

        let ab = pairs
            .iter()
            .find(|p| p.file_a == "A" && p.file_b == "B")
            .expect("A->B pair");
        assert!((ab.support - 0.75).abs() < 1e-9);
        assert!((ab.confidence - 0.75).abs() < 1e-9);

        // B only ever appears with A
        let ba = pairs
            .iter()
            .find(|p| p.file_a == "B" && p.file_b == "A")
            .expect("B->A pair");
        assert!((ba.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn low_confidence_pairs_are_dropped() {
        let mut commits = vec![commit("c0", &["A", "B"])];
        for i in 0..9 {
            commits.push(commit(&format!("c{}", i + 1), &["A"]));
        }
        let pairs = mine_cochange(&commits);
        // A->B confidence 0.1 is dropped, B->A confidence 1.0 survives
        assert!(pairs.iter().all(|p| p.file_a != "A"));
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].file_a, "B");
    }

    #[test]
    fn sorted_by_confidence_desc() {
        let commits = vec![
            commit("c1", &["A", "B"]),
            commit("c2", &["A", "B"]),
            commit("c3", &["A", "C"]),
            commit("c4", &["A"]),
        ];
        let pairs = mine_cochange(&commits);
        for window in pairs.windows(2) {
            assert!(window[0].confidence >= window[1].confidence);
        }
    }

    #[test]
    fn duplicate_files_in_one_commit_count_once() {
        let commits = vec![commit("c1", &["A", "A", "B"]), commit("c2", &["A", "B"])];
        let pairs = mine_cochange(&commits);
        let ab = pairs.iter().find(|p| p.file_a == "A").unwrap();
        assert_eq!(ab.cooccurrences, 2);
        assert!((ab.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_history_is_empty() {
        assert!(mine_cochange(&[]).is_empty());
    }
}

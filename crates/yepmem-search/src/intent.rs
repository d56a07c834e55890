//! Query intent classification.
//!
//! Regex pattern families vote per intent over the lowercased query. Two or
//! more hits select the intent outright; a single hit only wins for short
//! queries (under 50 characters); otherwise the next intent is tried, with
//! `Default` as the fallback. Each intent carries the rerank weight preset
//! applied by the hybrid searcher.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Queries shorter than this accept a single pattern hit.
const SHORT_QUERY_LEN: usize = 50;

/// Classified query intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    RecentChange,
    HowItWorks,
    FindCode,
    Debug,
    Default,
}

/// Rerank weights selected by intent. The vector-similarity weight is
/// implicit: `1 - (recency + file_overlap + keyword_density + symbol_match)`
/// of the normalized blend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankWeights {
    pub recency: f32,
    pub file_overlap: f32,
    pub keyword_density: f32,
    pub symbol_match: f32,
}

impl QueryIntent {
    /// Weight preset for this intent.
    pub fn weights(&self) -> RerankWeights {
        match self {
            QueryIntent::RecentChange => RerankWeights {
                recency: 0.50,
                file_overlap: 0.20,
                keyword_density: 0.20,
                symbol_match: 0.10,
            },
            QueryIntent::HowItWorks => RerankWeights {
                recency: 0.05,
                file_overlap: 0.15,
                keyword_density: 0.50,
                symbol_match: 0.30,
            },
            QueryIntent::FindCode => RerankWeights {
                recency: 0.05,
                file_overlap: 0.20,
                keyword_density: 0.25,
                symbol_match: 0.50,
            },
            QueryIntent::Debug => RerankWeights {
                recency: 0.20,
                file_overlap: 0.30,
                keyword_density: 0.30,
                symbol_match: 0.20,
            },
            QueryIntent::Default => RerankWeights {
                recency: 0.15,
                file_overlap: 0.25,
                keyword_density: 0.35,
                symbol_match: 0.25,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::RecentChange => "recent_change",
            QueryIntent::HowItWorks => "how_it_works",
            QueryIntent::FindCode => "find_code",
            QueryIntent::Debug => "debug",
            QueryIntent::Default => "default",
        }
    }
}

/// Pattern families, checked in declaration order.
static INTENT_PATTERNS: Lazy<Vec<(QueryIntent, Vec<Regex>)>> = Lazy::new(|| {
    let family = |patterns: &[&str]| -> Vec<Regex> {
        patterns
            .iter()
            .map(|p| Regex::new(p).expect("intent pattern must compile"))
            .collect()
    };

    vec![
        (
            QueryIntent::RecentChange,
            family(&[
                r"\brecent(ly)?\b",
                r"\bchanged?\b",
                r"\blatest\b",
                r"\blast\s+(week|month|commit|session|change)\b",
                r"\bwhat\s+happened\b",
                r"\byesterday\b",
                r"\bnew(est)?\b",
                r"\bupdated?\b",
            ]),
        ),
        (
            QueryIntent::HowItWorks,
            family(&[
                r"\bhow\s+(does|do|is|are)\b",
                r"\bhow\s+\w+\s+works?\b",
                r"\bexplain\b",
                r"\bwhat\s+is\b",
                r"\bwhy\s+(does|do|is)\b",
                r"\barchitecture\b",
                r"\bflow\b",
                r"\bunderstand\b",
            ]),
        ),
        (
            QueryIntent::FindCode,
            family(&[
                r"\bwhere\s+is\b",
                r"\bfind\b",
                r"\blocate\b",
                r"\bdefinition\s+of\b",
                r"\bdefined\b",
                r"\bimplementation\s+of\b",
                r"\bfunction\s+\w+",
                r"\bclass\s+\w+",
            ]),
        ),
        (
            QueryIntent::Debug,
            family(&[
                r"\bbug\b",
                r"\berror\b",
                r"\bfail(s|ed|ing|ure)?\b",
                r"\bbroken?\b",
                r"\bcrash(es|ed|ing)?\b",
                r"\bfix(es|ed|ing)?\b",
                r"\bexception\b",
                r"\bwrong\b",
            ]),
        ),
    ]
});

/// Classify a query. Depends only on the lowercased text.
pub fn detect_intent(query: &str) -> QueryIntent {
    let query = query.to_lowercase();
    let short = query.chars().count() < SHORT_QUERY_LEN;

    for (intent, patterns) in INTENT_PATTERNS.iter() {
        let hits = patterns.iter().filter(|p| p.is_match(&query)).count();
        if hits >= 2 || (hits == 1 && short) {
            return *intent;
        }
    }
    QueryIntent::Default
}

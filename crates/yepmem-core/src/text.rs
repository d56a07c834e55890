//! Text utilities shared by search, analytics, and the store.
//!
//! The tokenizer here is the single tokenization rule for the whole system:
//! full-text match expressions, keyword-density scoring, and duplicate
//! shingling all go through [`tokenize`] so their vocabularies agree.

/// Characters that terminate a token, in addition to whitespace.
const SEPARATORS: &str = "/.,;:!?()[]{}<>'\"=+-*&#@|\\`~^";

/// Minimum token length; shorter tokens carry no signal and are dropped.
const MIN_TOKEN_LEN: usize = 3;

/// Lowercase and split `text` into search tokens.
///
/// Splits on whitespace and on every separator in [`SEPARATORS`]; tokens of
/// length <= 2 are dropped. The output is stable for a given input.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || SEPARATORS.contains(c))
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .map(|t| t.to_string())
        .collect()
}

/// Escape a value for interpolation into an FTS predicate.
///
/// Backslashes double, single quotes double per SQL string rules, and NUL
/// bytes are stripped. Parameterized statements remain the backend's job;
/// this guards the match-expression path where parameters cannot be used.
pub fn escape_fts(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '\0')
        .flat_map(|c| match c {
            '\\' => vec!['\\', '\\'],
            '\'' => vec!['\'', '\''],
            other => vec![other],
        })
        .collect()
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector is zero or lengths differ; the result is
/// always within [-1, 1].
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    sim.clamp(-1.0, 1.0) as f32
}

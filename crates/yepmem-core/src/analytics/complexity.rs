//! Cyclomatic and cognitive complexity from token scanning.
//!
//! Both metrics are text-level approximations: cyclomatic counts
//! branch-creating tokens, cognitive additionally charges the nesting depth
//! at each branch. Depth comes from brace tracking, with an indentation
//! fallback for brace-less bodies (Python).

use serde::Serialize;

use crate::model::CodeChunk;

/// Keywords that open a branch.
const BRANCH_KEYWORDS: &[&str] = &["if", "for", "while", "case", "catch"];

/// Complexity metrics for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct ComplexityReport {
    pub symbol: String,
    pub path: String,
    pub cyclomatic: usize,
    pub cognitive: usize,
}

impl ComplexityReport {
    pub fn for_chunk(chunk: &CodeChunk) -> Self {
        let body = &chunk.symbol.body;
        Self {
            symbol: chunk.symbol.name.clone(),
            path: chunk.symbol.path.clone(),
            cyclomatic: cyclomatic_complexity(body),
            cognitive: cognitive_complexity(body),
        }
    }
}

/// 1 + number of branch-creating tokens.
pub fn cyclomatic_complexity(body: &str) -> usize {
    1 + branches(body).len()
}

/// Cyclomatic plus the nesting depth at each branch.
pub fn cognitive_complexity(body: &str) -> usize {
    1 + branches(body).iter().map(|b| 1 + b.depth).sum::<usize>()
}

struct Branch {
    depth: usize,
}

/// Scan the body for branch tokens, recording nesting depth at each.
///
/// Brace depth is exact for brace languages, indentation-derived per line
/// otherwise.
fn branches(body: &str) -> Vec<Branch> {
    let uses_braces = body.contains('{');
    let mut found = Vec::new();

    let mut depth: usize = 0;
    for (line_no, line) in body.lines().enumerate() {
        let line_depth = if uses_braces {
            depth
        } else {
            indent_depth(line)
        };
        // The declaration line itself is not "nested in" its own body
        let line_depth = line_depth.saturating_sub(usize::from(line_no > 0 && uses_braces));

        for word in split_words(line) {
            if BRANCH_KEYWORDS.contains(&word) {
                found.push(Branch { depth: line_depth });
            }
        }
        found.extend(operator_branches(line, line_depth));

        if uses_braces {
            for c in line.chars() {
                match c {
                    '{' => depth += 1,
                    '}' => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
        }
    }

    found
}

/// `&&`, `||`, and ternary `?` on one line.
fn operator_branches(line: &str, depth: usize) -> Vec<Branch> {
    let mut out = Vec::new();
    for _ in 0..line.matches("&&").count() {
        out.push(Branch { depth });
    }
    for _ in 0..line.matches("||").count() {
        out.push(Branch { depth });
    }
    // Ternary: a bare `?` that is not optional chaining or nullish coalescing
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b != b'?' {
            continue;
        }
        let prev = i.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(i + 1);
        if prev == Some(b'?') || next == Some(&b'?') || next == Some(&b'.') {
            continue;
        }
        out.push(Branch { depth });
    }
    out
}

fn split_words(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
}

/// Indentation level in units of 4 spaces (tabs count as one level).
fn indent_depth(line: &str) -> usize {
    let mut spaces = 0;
    let mut tabs = 0;
    for c in line.chars() {
        match c {
            ' ' => spaces += 1,
            '\t' => tabs += 1,
            _ => break,
        }
    }
    tabs + spaces / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_line_code_is_one() {
        assert_eq!(cyclomatic_complexity("fn f() { g(); }"), 1);
        assert_eq!(cognitive_complexity("fn f() { g(); }"), 1);
    }

    #[test]
    fn each_branch_adds_one() {
        let body = "function f(a, b) {\n  if (a) { g(); }\n  for (;;) { h(); }\n}";
        assert_eq!(cyclomatic_complexity(body), 3);
    }

    #[test]
    fn logical_operators_count() {
        let body = "fn f() { if a && b || c { g(); } }";
        // if + && + ||
        assert_eq!(cyclomatic_complexity(body), 4);
    }

    #[test]
    fn ternary_counts_but_optional_chaining_does_not() {
        assert_eq!(cyclomatic_complexity("const x = a ? b : c;"), 2);
        assert_eq!(cyclomatic_complexity("const x = a?.b;"), 1);
        assert_eq!(cyclomatic_complexity("const x = a ?? b;"), 1);
    }

    #[test]
    fn cognitive_charges_nesting() {
        let flat = "function f() {\n  if (a) { g(); }\n  if (b) { g(); }\n}";
        let nested = "function f() {\n  if (a) {\n    if (b) { g(); }\n  }\n}";
        // same cyclomatic, higher cognitive when nested
        assert_eq!(cyclomatic_complexity(flat), cyclomatic_complexity(nested));
        assert!(cognitive_complexity(nested) > cognitive_complexity(flat));
    }

    #[test]
    fn python_indentation_depth() {
        let flat = "def f():\n    if a:\n        g()\n    if b:\n        g()\n";
        let nested = "def f():\n    if a:\n        if b:\n            g()\n";
        assert!(cognitive_complexity(nested) >= cognitive_complexity(flat) - 1);
        assert_eq!(cyclomatic_complexity(flat), 3);
        assert_eq!(cyclomatic_complexity(nested), 3);
    }
}

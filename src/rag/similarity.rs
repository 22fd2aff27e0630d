//! Token-level text similarity used for deduplication and relevance.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

static TOKEN_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn token_regex() -> Option<&'static Regex> {
    // Han characters are tokens on their own; other scripts split on non-word runs.
    TOKEN_RE
        .get_or_init(|| Regex::new(r"\p{Han}|[^\p{Han}\W_]+").ok())
        .as_ref()
}

/// Lowercased token set of `text`.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    match token_regex() {
        Some(re) => re
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect(),
        None => lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Jaccard similarity of two token sets. Two empty sets are unrelated.
pub fn jaccard(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    if left.is_empty() && right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(right).count();
    let union = left.len() + right.len() - intersection;
    intersection as f64 / union as f64
}

/// Fraction of `query` tokens that also occur in `text`.
pub fn query_coverage(query: &BTreeSet<String>, text: &str) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let tokens = tokenize(text);
    query.intersection(&tokens).count() as f64 / query.len() as f64
}

pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.trim().as_bytes()))
}

//! Deterministic keyword extraction for overlap scoring.

use std::collections::{BTreeSet, HashSet};

use crate::core::config::KeywordConfig;
use crate::rag::similarity::tokenize;

#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    domain_terms: Vec<String>,
    stop_words: HashSet<String>,
    include_generic_terms: bool,
    min_term_chars: usize,
}

impl KeywordExtractor {
    pub fn new(config: &KeywordConfig) -> Self {
        Self {
            domain_terms: config
                .domain_terms
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
            include_generic_terms: config.include_generic_terms,
            min_term_chars: config.min_term_chars,
        }
    }

    /// Recognized domain terms occurring in `text`.
    pub fn domain_terms(&self, text: &str) -> BTreeSet<String> {
        let lowered = text.to_lowercase();
        self.domain_terms
            .iter()
            .filter(|term| lowered.contains(term.as_str()))
            .cloned()
            .collect()
    }

    pub fn is_domain_term(&self, term: &str) -> bool {
        self.domain_terms.iter().any(|t| t == term)
    }

    /// Domain terms plus, when enabled, content words that survive
    /// stop-word and length filtering.
    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        let mut keywords = self.domain_terms(text);
        if self.include_generic_terms {
            keywords.extend(tokenize(text).into_iter().filter(|token| {
                token.chars().count() >= self.min_term_chars
                    && token.chars().all(char::is_alphabetic)
                    && !self.stop_words.contains(token)
            }));
        }
        keywords
    }
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(&KeywordConfig::default())
    }
}

/// Share of `query` keywords that also appear in `turn`.
pub fn keyword_overlap_ratio(query: &BTreeSet<String>, turn: &BTreeSet<String>) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    query.intersection(turn).count() as f64 / query.len() as f64
}

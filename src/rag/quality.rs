//! Retrieval quality scoring.
//!
//! A 0–100 composite of coverage, semantic strength and source diversity.
//! The scorer is pure: identical chunks always produce identical reports.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::types::{Chunk, RetrievalResult};
use crate::core::config::ScoringConfig;
use crate::core::errors::EngineError;

/// Neutral normalized score used when a chunk carries no usable similarity.
const NEUTRAL_SEMANTIC: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub score: f64,
    pub coverage: f64,
    pub semantic: f64,
    pub diversity: f64,
    pub chunk_count: usize,
    pub avg_content_chars: f64,
    /// Chunks whose embedding_score had to be replaced by the midpoint.
    pub malformed_scores: usize,
}

impl QualityReport {
    pub fn empty() -> Self {
        Self {
            score: 0.0,
            coverage: 0.0,
            semantic: 0.0,
            diversity: 0.0,
            chunk_count: 0,
            avg_content_chars: 0.0,
            malformed_scores: 0,
        }
    }

    /// Whether the caller should look for supplementary (web) evidence.
    ///
    /// A single-source result is always supplemented, whatever its score.
    pub fn needs_supplement(&self, threshold: f64) -> bool {
        self.score < threshold || (self.chunk_count > 0 && self.diversity <= 0.0)
    }

    pub fn recommendations(&self) -> Vec<String> {
        let mut hints = Vec::new();
        if self.chunk_count == 0 {
            hints.push("No local documents matched; rely on web search or rephrase the question".to_string());
            return hints;
        }
        if self.coverage < 60.0 {
            hints.push(format!(
                "Only {} chunk(s) retrieved; consider widening k or adding documents",
                self.chunk_count
            ));
        }
        if self.avg_content_chars < 100.0 {
            hints.push("Retrieved fragments are short; larger chunks may carry more context".to_string());
        }
        if self.diversity <= 0.0 {
            hints.push("All chunks come from a single source; supplement with other sources".to_string());
        }
        if self.semantic < 50.0 {
            hints.push("Weak semantic match; the index may not cover this topic".to_string());
        }
        if self.malformed_scores > 0 {
            hints.push(format!(
                "{} chunk(s) had no similarity score and were scored neutrally",
                self.malformed_scores
            ));
        }
        if hints.is_empty() {
            hints.push("Retrieval quality is good".to_string());
        }
        hints
    }
}

#[derive(Debug, Clone)]
pub struct QualityScorer {
    config: ScoringConfig,
}

impl QualityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(&self, result: &RetrievalResult) -> f64 {
        self.report(&result.chunks).score
    }

    pub fn report(&self, chunks: &[Chunk]) -> QualityReport {
        if chunks.is_empty() {
            return QualityReport::empty();
        }

        let count = chunks.len();
        let coverage = (count as f64 / self.config.target_count.max(1) as f64).min(1.0) * 100.0;

        let mut malformed = 0usize;
        let semantic_sum: f64 = chunks
            .iter()
            .map(|chunk| match self.normalize(chunk) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(chunk_id = %chunk.id, "{}", err);
                    malformed += 1;
                    NEUTRAL_SEMANTIC
                }
            })
            .sum();
        let semantic = semantic_sum / count as f64 * 100.0;

        let distinct_sources: BTreeSet<&str> =
            chunks.iter().map(|chunk| chunk.source.as_str()).collect();
        let diversity = if count > 1 {
            (distinct_sources.len() - 1) as f64 / (count - 1) as f64 * 100.0
        } else {
            0.0
        };

        let weights = [
            (self.config.coverage_weight, coverage),
            (self.config.semantic_weight, semantic),
            (self.config.diversity_weight, diversity),
        ];
        let total_weight: f64 = weights.iter().map(|(w, _)| w).sum();
        let weighted: f64 = weights.iter().map(|(w, s)| w * s).sum();
        let score = if total_weight > 0.0 {
            (weighted / total_weight).round().clamp(0.0, 100.0)
        } else {
            0.0
        };

        let avg_content_chars = chunks
            .iter()
            .map(|chunk| chunk.content.chars().count())
            .sum::<usize>() as f64
            / count as f64;

        QualityReport {
            score,
            coverage,
            semantic,
            diversity,
            chunk_count: count,
            avg_content_chars,
            malformed_scores: malformed,
        }
    }

    /// Embedding score mapped into [0, 1] using the index's score range.
    pub fn normalize(&self, chunk: &Chunk) -> Result<f64, EngineError> {
        let raw = chunk.embedding_score as f64;
        if !raw.is_finite() {
            return Err(EngineError::MalformedScoreInput(format!(
                "chunk '{}' has no usable embedding_score",
                chunk.id
            )));
        }
        let span = self.config.score_max - self.config.score_min;
        if span <= 0.0 {
            return Ok(NEUTRAL_SEMANTIC);
        }
        Ok(((raw - self.config.score_min) / span).clamp(0.0, 1.0))
    }

    /// Like [`normalize`](Self::normalize) but substitutes the midpoint.
    pub fn normalize_or_neutral(&self, chunk: &Chunk) -> f64 {
        self.normalize(chunk).unwrap_or(NEUTRAL_SEMANTIC)
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, source: &str, score: f32) -> Chunk {
        Chunk::new(id, format!("content for {}", id), source, score)
    }

    #[test]
    fn empty_result_scores_zero() {
        let report = QualityScorer::default().report(&[]);
        assert_eq!(report.score, 0.0);
        assert_eq!(report.chunk_count, 0);
        assert!(report.needs_supplement(60.0));
    }

    #[test]
    fn single_source_result_triggers_supplement() {
        let chunks: Vec<Chunk> = (0..5).map(|i| chunk(&format!("c{}", i), "one.md", 0.9)).collect();
        let report = QualityScorer::default().report(&chunks);

        assert_eq!(report.coverage, 100.0);
        assert!((report.semantic - 90.0).abs() < 1e-3);
        assert_eq!(report.diversity, 0.0);
        assert_eq!(report.score, 63.0);
        assert!(report.score < 100.0);
        assert!(report.needs_supplement(60.0));
    }

    #[test]
    fn diverse_strong_result_does_not_need_supplement() {
        let chunks: Vec<Chunk> = (0..5)
            .map(|i| chunk(&format!("c{}", i), &format!("doc{}.md", i), 0.8))
            .collect();
        let report = QualityScorer::default().report(&chunks);

        assert_eq!(report.diversity, 100.0);
        assert_eq!(report.score, 93.0);
        assert!(!report.needs_supplement(60.0));
    }

    #[test]
    fn missing_score_uses_midpoint() {
        let chunks = vec![chunk("a", "x", f32::NAN), chunk("b", "y", f32::NAN)];
        let report = QualityScorer::default().report(&chunks);
        assert_eq!(report.malformed_scores, 2);
        assert!((report.semantic - 50.0).abs() < 1e-9);
    }

    #[test]
    fn scores_stay_in_range_and_are_deterministic() {
        let scorer = QualityScorer::default();
        let chunks = vec![chunk("a", "x", 7.5), chunk("b", "x", -3.0), chunk("c", "y", 0.4)];
        let first = scorer.report(&chunks);
        let second = scorer.report(&chunks);
        assert_eq!(first, second);
        assert!((0.0..=100.0).contains(&first.score));
    }

    #[test]
    fn recommendations_mention_single_source() {
        let chunks = vec![chunk("a", "x", 0.9), chunk("b", "x", 0.9)];
        let hints = QualityScorer::default().report(&chunks).recommendations();
        assert!(hints.iter().any(|h| h.contains("single source")));
    }
}

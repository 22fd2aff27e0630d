//! Web Search Fusion.
//!
//! Scores local chunks and web hits on a shared [0, 1] scale, removes
//! near-duplicates and keeps the best `max_items`.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use super::quality::QualityScorer;
use super::similarity::{jaccard, query_coverage, tokenize};
use super::types::{Evidence, FusedContext, FusedItem, RetrievalResult, WebResult};
use crate::core::config::{FusionConfig, QueryAugmentation};
use crate::core::errors::with_deadline;
use crate::search::WebSearch;

/// What the web collaborator contributed to a fusion.
#[derive(Debug, Clone)]
pub enum WebOutcome {
    NotRequested,
    Unavailable(String),
    Results(Vec<WebResult>),
}

/// Extend `query` with the configured suffix when it mentions a trigger term.
pub fn augment_query(query: &str, rules: &QueryAugmentation) -> String {
    let trimmed = query.trim();
    let lowered = trimmed.to_lowercase();
    let suffix = rules.suffix.trim();

    if suffix.is_empty()
        || trimmed.chars().count() >= rules.max_query_chars
        || lowered.contains(&suffix.to_lowercase())
    {
        return trimmed.to_string();
    }

    let triggered = rules
        .trigger_terms
        .iter()
        .any(|term| lowered.contains(&term.to_lowercase()));
    if triggered {
        format!("{} {}", trimmed, suffix)
    } else {
        trimmed.to_string()
    }
}

/// Composite score of a web hit, within [0, 1].
pub fn web_composite_score(
    result: &WebResult,
    query_tokens: &BTreeSet<String>,
    config: &FusionConfig,
) -> f64 {
    let length = result.snippet.chars().count() as f64;
    let content_length = (length / config.content_length_target.max(1) as f64).min(1.0);
    let credibility = result.credibility_score.clamp(0.0, 1.0);
    let relevance = query_coverage(query_tokens, &result.text());

    weighted(
        &[
            (config.content_length_weight, content_length),
            (config.credibility_weight, credibility),
            (config.relevance_weight, relevance),
        ],
    )
}

fn weighted(parts: &[(f64, f64)]) -> f64 {
    let total: f64 = parts.iter().map(|(w, _)| w).sum();
    if total <= 0.0 {
        return 0.0;
    }
    (parts.iter().map(|(w, v)| w * v).sum::<f64>() / total).clamp(0.0, 1.0)
}

pub struct WebFusion {
    config: FusionConfig,
    scorer: QualityScorer,
    search: Option<Arc<dyn WebSearch>>,
    web_timeout: Duration,
}

impl WebFusion {
    pub fn new(
        config: FusionConfig,
        scorer: QualityScorer,
        search: Option<Arc<dyn WebSearch>>,
        web_timeout: Duration,
    ) -> Self {
        Self {
            config,
            scorer,
            search,
            web_timeout,
        }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn augment_query(&self, query: &str) -> String {
        augment_query(query, &self.config.augmentation)
    }

    /// Query the web collaborator (augmented, under timeout) and fuse its
    /// results with `local`. Failures only set `web_unavailable`.
    pub async fn supplement(&self, local: &RetrievalResult, query: &str) -> FusedContext {
        let web_query = self.augment_query(query);
        let outcome = match &self.search {
            None => WebOutcome::Unavailable("no web search configured".to_string()),
            Some(search) => {
                match with_deadline(
                    "web search",
                    self.web_timeout,
                    search.search(&web_query, self.config.web_max_results),
                )
                .await
                {
                    Ok(results) => WebOutcome::Results(results),
                    Err(err) => WebOutcome::Unavailable(err.to_string()),
                }
            }
        };

        let mut fused = self.fuse(local, outcome);
        fused.web_query = Some(web_query);
        fused
    }

    pub fn fuse(&self, local: &RetrievalResult, web: WebOutcome) -> FusedContext {
        let query_tokens = tokenize(&local.query);

        let mut candidates: Vec<FusedItem> = local
            .chunks
            .iter()
            .map(|chunk| FusedItem {
                composite_score: self.scorer.normalize_or_neutral(chunk),
                evidence: Evidence::Local(chunk.clone()),
            })
            .collect();

        let web_unavailable = match web {
            WebOutcome::NotRequested => false,
            WebOutcome::Unavailable(reason) => {
                tracing::warn!("Web search unavailable, using local results only: {}", reason);
                true
            }
            WebOutcome::Results(results) => {
                candidates.extend(results.into_iter().map(|result| FusedItem {
                    composite_score: web_composite_score(&result, &query_tokens, &self.config),
                    evidence: Evidence::Web(result),
                }));
                false
            }
        };

        // stable: locals stay ahead of web hits with equal scores
        candidates.sort_by(|a, b| {
            b.composite_score
                .partial_cmp(&a.composite_score)
                .unwrap_or(Ordering::Equal)
        });

        let mut items: Vec<FusedItem> = Vec::new();
        let mut kept_tokens: Vec<BTreeSet<String>> = Vec::new();
        for candidate in candidates {
            if items.len() >= self.config.max_items {
                break;
            }
            let tokens = tokenize(&candidate.evidence.text());
            let duplicate = kept_tokens
                .iter()
                .any(|kept| jaccard(kept, &tokens) >= self.config.dedup_threshold);
            if duplicate {
                tracing::debug!(id = candidate.evidence.id(), "Dropping near-duplicate evidence");
                continue;
            }
            kept_tokens.push(tokens);
            items.push(candidate);
        }

        let composite_score = if items.is_empty() {
            0.0
        } else {
            items.iter().map(|item| item.composite_score).sum::<f64>() / items.len() as f64
        };

        FusedContext {
            items,
            composite_score,
            web_unavailable,
            web_query: None,
        }
    }
}

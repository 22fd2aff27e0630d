//! Web search collaborators.

pub mod credibility;
pub mod engines;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;

use crate::core::config::{CollaboratorConfig, CredibilityTable, FusionConfig};
use crate::core::errors::EngineError;
use crate::rag::WebResult;

pub use credibility::{credibility_for_domain, source_domain};
pub use engines::{DuckDuckGoSearch, WikipediaSearch};

#[async_trait]
pub trait WebSearch: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, EngineError>;
}

/// Fans a query out to several engines and merges what comes back.
///
/// Fails only when every engine fails.
pub struct MultiEngineSearch {
    engines: Vec<Arc<dyn WebSearch>>,
    credibility: CredibilityTable,
    min_content_chars: usize,
}

impl MultiEngineSearch {
    pub fn new(
        engines: Vec<Arc<dyn WebSearch>>,
        credibility: CredibilityTable,
        min_content_chars: usize,
    ) -> Self {
        Self {
            engines,
            credibility,
            min_content_chars,
        }
    }

    pub fn from_config(collaborators: &CollaboratorConfig, fusion: &FusionConfig) -> Self {
        let timeout = Duration::from_millis(collaborators.web_timeout_ms);
        let engines: Vec<Arc<dyn WebSearch>> = collaborators
            .web_engines
            .iter()
            .filter_map(|name| -> Option<Arc<dyn WebSearch>> {
                match name.as_str() {
                    "duckduckgo" => Some(Arc::new(DuckDuckGoSearch::new(timeout))),
                    "wikipedia" => Some(Arc::new(WikipediaSearch::new(timeout))),
                    other => {
                        tracing::warn!("Unknown web engine '{}' ignored", other);
                        None
                    }
                }
            })
            .collect();
        Self::new(
            engines,
            fusion.credibility.clone(),
            fusion.min_web_content_chars,
        )
    }

    pub fn engine_names(&self) -> Vec<String> {
        self.engines.iter().map(|e| e.name().to_string()).collect()
    }
}

#[async_trait]
impl WebSearch for MultiEngineSearch {
    fn name(&self) -> &str {
        "multi"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, EngineError> {
        if self.engines.is_empty() {
            return Err(EngineError::web("no web engines configured"));
        }

        let outcomes = join_all(
            self.engines
                .iter()
                .map(|engine| engine.search(query, max_results)),
        )
        .await;

        let mut failures = Vec::new();
        let mut seen_urls = HashSet::new();
        let mut merged = Vec::new();
        for (engine, outcome) in self.engines.iter().zip(outcomes) {
            match outcome {
                Ok(results) => {
                    tracing::debug!(engine = engine.name(), hits = results.len(), "Web engine answered");
                    for mut result in results {
                        if result.snippet.chars().count() < self.min_content_chars {
                            continue;
                        }
                        if !seen_urls.insert(result.url.clone()) {
                            continue;
                        }
                        result.credibility_score =
                            credibility_for_domain(&result.source_domain, &self.credibility);
                        merged.push(result);
                    }
                }
                Err(err) => {
                    tracing::warn!(engine = engine.name(), "Web engine failed: {}", err);
                    failures.push(format!("{}: {}", engine.name(), err));
                }
            }
        }

        if failures.len() == self.engines.len() {
            return Err(EngineError::WebSearchUnavailable(failures.join("; ")));
        }

        // stable sort keeps engine order among equally credible hits
        merged.sort_by(|a, b| {
            b.credibility_score
                .partial_cmp(&a.credibility_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        merged.truncate(max_results);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubEngine {
        name: &'static str,
        results: Result<Vec<WebResult>, String>,
    }

    #[async_trait]
    impl WebSearch for StubEngine {
        fn name(&self) -> &str {
            self.name
        }

        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<WebResult>, EngineError> {
            self.results.clone().map_err(EngineError::web)
        }
    }

    fn hit(url: &str, snippet: &str) -> WebResult {
        WebResult {
            title: "t".into(),
            snippet: snippet.into(),
            url: url.into(),
            source_domain: source_domain(url),
            credibility_score: 0.0,
        }
    }

    fn long(text: &str) -> String {
        format!("{} {}", text, "x".repeat(60))
    }

    #[tokio::test]
    async fn merges_engines_and_assigns_credibility() {
        let search = MultiEngineSearch::new(
            vec![
                Arc::new(StubEngine {
                    name: "a",
                    results: Ok(vec![
                        hit("https://blog.example.com/a", &long("blog")),
                        hit("https://blog.example.com/short", "too short"),
                    ]),
                }),
                Arc::new(StubEngine {
                    name: "b",
                    results: Ok(vec![
                        hit("https://en.wikipedia.org/wiki/Tense", &long("wiki")),
                        hit("https://blog.example.com/a", &long("dup")),
                    ]),
                }),
            ],
            CredibilityTable::default(),
            50,
        );

        let results = search.search("tense", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source_domain, "en.wikipedia.org");
        assert!(results[0].credibility_score > results[1].credibility_score);
    }

    #[tokio::test]
    async fn one_failing_engine_is_tolerated() {
        let search = MultiEngineSearch::new(
            vec![
                Arc::new(StubEngine {
                    name: "down",
                    results: Err("timeout".into()),
                }),
                Arc::new(StubEngine {
                    name: "up",
                    results: Ok(vec![hit("https://example.com/a", &long("ok"))]),
                }),
            ],
            CredibilityTable::default(),
            50,
        );
        assert_eq!(search.search("q", 3).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn all_engines_failing_is_unavailable() {
        let search = MultiEngineSearch::new(
            vec![Arc::new(StubEngine {
                name: "down",
                results: Err("dns".into()),
            })],
            CredibilityTable::default(),
            50,
        );
        let err = search.search("q", 3).await.unwrap_err();
        assert!(matches!(err, EngineError::WebSearchUnavailable(msg) if msg.contains("dns")));
    }
}

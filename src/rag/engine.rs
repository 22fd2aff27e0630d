//! Strategy Retriever.
//!
//! Runs similarity and diversity lookups against the embedding index and
//! merges them into one scored [`RetrievalResult`].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::quality::QualityScorer;
use super::store::{EmbeddingIndex, SearchMode};
use super::types::{Chunk, RetrievalMethod, RetrievalResult, Strategy};
use crate::core::config::RetrievalConfig;
use crate::core::errors::{with_deadline, EngineError};
use crate::llm::Embedder;

#[derive(Clone)]
pub struct StrategyRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn EmbeddingIndex>,
    scorer: QualityScorer,
    config: RetrievalConfig,
    index_timeout: Duration,
}

impl StrategyRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn EmbeddingIndex>,
        scorer: QualityScorer,
        config: RetrievalConfig,
        index_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            index,
            scorer,
            config,
            index_timeout,
        }
    }

    pub fn scorer(&self) -> &QualityScorer {
        &self.scorer
    }

    pub fn default_k(&self) -> usize {
        self.config.k
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> RetrievalResult {
        self.retrieve_with(query, k, RetrievalMethod::Enhanced).await
    }

    /// Never fails: embedder or index trouble yields an empty result
    /// flagged `index_unavailable`.
    pub async fn retrieve_with(
        &self,
        query: &str,
        k: usize,
        method: RetrievalMethod,
    ) -> RetrievalResult {
        let k = k.max(1);
        let embedding = match with_deadline(
            "embedder",
            self.index_timeout,
            self.embedder.embed_query(query),
        )
        .await
        {
            Ok(embedding) => embedding,
            Err(err) => {
                tracing::warn!("Query embedding failed, continuing without local results: {}", err);
                return RetrievalResult::unavailable(query);
            }
        };

        let outcome = match method {
            RetrievalMethod::Similarity => self
                .lookup(&embedding, k, SearchMode::Similarity)
                .await
                .map(|chunks| (Strategy::Similarity, chunks)),
            RetrievalMethod::Diversity => self
                .lookup(&embedding, k, SearchMode::Diversity)
                .await
                .map(|chunks| (Strategy::Diversity, chunks)),
            RetrievalMethod::Enhanced => self.enhanced(&embedding, k).await,
        };

        let (strategy, chunks) = match outcome {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!("Embedding index unavailable: {}", err);
                return RetrievalResult::unavailable(query);
            }
        };

        if chunks.is_empty() {
            tracing::debug!("{}", EngineError::EmptyIndex);
        }

        let mut result = RetrievalResult {
            query: query.to_string(),
            strategy,
            chunks,
            quality_score: 0.0,
            index_unavailable: false,
        };
        result.quality_score = self.scorer.score(&result);
        tracing::debug!(
            strategy = ?result.strategy,
            chunks = result.chunks.len(),
            quality = result.quality_score,
            "Retrieval finished"
        );
        result
    }

    async fn enhanced(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<(Strategy, Vec<Chunk>), EngineError> {
        if self.config.concurrent_strategies {
            let (similar, diverse) = tokio::join!(
                self.lookup(embedding, k, SearchMode::Similarity),
                self.lookup(embedding, k, SearchMode::Diversity)
            );
            let similar = similar?;
            if similar.len() >= self.config.min_similarity_results {
                return Ok((Strategy::Similarity, similar));
            }
            return Ok(match diverse {
                Ok(diverse) => (Strategy::Fused, merge_strategies(similar, diverse, k)),
                Err(err) => {
                    tracing::warn!("Diversity lookup failed: {}", err);
                    (Strategy::Similarity, similar)
                }
            });
        }

        let similar = self.lookup(embedding, k, SearchMode::Similarity).await?;
        if similar.len() >= self.config.min_similarity_results {
            return Ok((Strategy::Similarity, similar));
        }

        tracing::debug!(
            found = similar.len(),
            min = self.config.min_similarity_results,
            "Similarity results short, merging diversity lookup"
        );
        match self.lookup(embedding, k, SearchMode::Diversity).await {
            Ok(diverse) => Ok((Strategy::Fused, merge_strategies(similar, diverse, k))),
            Err(err) => {
                tracing::warn!("Diversity lookup failed: {}", err);
                Ok((Strategy::Similarity, similar))
            }
        }
    }

    async fn lookup(
        &self,
        embedding: &[f32],
        k: usize,
        mode: SearchMode,
    ) -> Result<Vec<Chunk>, EngineError> {
        with_deadline(
            "embedding index",
            self.index_timeout,
            self.index.search(embedding, k, mode),
        )
        .await
    }
}

fn sort_key(score: f32) -> f32 {
    if score.is_finite() {
        score
    } else {
        f32::NEG_INFINITY
    }
}

/// Merge similarity and diversity hits.
///
/// Chunks with equal content hashes collapse to the higher-scored copy.
/// Output is ordered by embedding_score descending, then similarity before
/// diversity, then original position.
pub fn merge_strategies(similar: Vec<Chunk>, diverse: Vec<Chunk>, k: usize) -> Vec<Chunk> {
    struct Tagged {
        chunk: Chunk,
        strategy: Strategy,
        position: usize,
    }

    let mut by_hash: HashMap<String, Tagged> = HashMap::new();
    let tagged = similar
        .into_iter()
        .enumerate()
        .map(|(position, chunk)| (Strategy::Similarity, position, chunk))
        .chain(
            diverse
                .into_iter()
                .enumerate()
                .map(|(position, chunk)| (Strategy::Diversity, position, chunk)),
        );

    for (strategy, position, chunk) in tagged {
        let hash = chunk.content_hash();
        match by_hash.get_mut(&hash) {
            Some(existing) => {
                if sort_key(chunk.embedding_score) > sort_key(existing.chunk.embedding_score) {
                    existing.chunk = chunk;
                }
            }
            None => {
                by_hash.insert(
                    hash,
                    Tagged {
                        chunk,
                        strategy,
                        position,
                    },
                );
            }
        }
    }

    let mut merged: Vec<Tagged> = by_hash.into_values().collect();
    merged.sort_by(|a, b| {
        sort_key(b.chunk.embedding_score)
            .partial_cmp(&sort_key(a.chunk.embedding_score))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.strategy.priority().cmp(&b.strategy.priority()))
            .then_with(|| a.position.cmp(&b.position))
    });
    merged.truncate(k);
    merged.into_iter().map(|t| t.chunk).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
            Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
            Err(EngineError::collaborator("connection refused"))
        }
    }

    struct StubIndex {
        similar: Vec<Chunk>,
        diverse: Vec<Chunk>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl EmbeddingIndex for StubIndex {
        async fn search(
            &self,
            _query_embedding: &[f32],
            k: usize,
            mode: SearchMode,
        ) -> Result<Vec<Chunk>, EngineError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let mut chunks = match mode {
                SearchMode::Similarity => self.similar.clone(),
                SearchMode::Diversity => self.diverse.clone(),
            };
            chunks.truncate(k);
            Ok(chunks)
        }

        async fn count(&self) -> Result<usize, EngineError> {
            Ok(self.similar.len())
        }
    }

    fn chunk(id: &str, content: &str, source: &str, score: f32) -> Chunk {
        Chunk::new(id, content, source, score)
    }

    fn retriever(embedder: Arc<dyn Embedder>, index: StubIndex) -> StrategyRetriever {
        StrategyRetriever::new(
            embedder,
            Arc::new(index),
            QualityScorer::default(),
            RetrievalConfig::default(),
            Duration::from_millis(200),
        )
    }

    #[test]
    fn merge_keeps_higher_score_on_hash_collision() {
        let similar = vec![chunk("s1", "shared text", "a", 0.6)];
        let diverse = vec![
            chunk("d1", "shared text", "a", 0.7),
            chunk("d2", "other text", "b", 0.5),
        ];
        let merged = merge_strategies(similar, diverse, 5);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "d1");
        assert!((merged[0].embedding_score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn merge_breaks_ties_similarity_first() {
        let similar = vec![chunk("s1", "one", "a", 0.5)];
        let diverse = vec![chunk("d1", "two", "b", 0.5)];
        let merged = merge_strategies(similar, diverse, 5);
        assert_eq!(merged[0].id, "s1");
        assert_eq!(merged[1].id, "d1");
    }

    #[tokio::test]
    async fn short_similarity_result_merges_diversity() {
        let index = StubIndex {
            similar: vec![chunk("s1", "present perfect", "a.md", 0.9)],
            diverse: vec![
                chunk("s1", "present perfect", "a.md", 0.9),
                chunk("d1", "past simple", "b.md", 0.4),
            ],
            delay: None,
        };
        let result = retriever(Arc::new(FixedEmbedder), index)
            .retrieve("present perfect", 5)
            .await;

        assert_eq!(result.strategy, Strategy::Fused);
        assert_eq!(result.chunks.len(), 2);
        assert_eq!(result.chunks[0].id, "s1");
        assert!(result.quality_score > 0.0 && result.quality_score <= 100.0);
    }

    #[tokio::test]
    async fn enough_similarity_results_skip_diversity() {
        let similar: Vec<Chunk> = (0..4)
            .map(|i| chunk(&format!("s{}", i), &format!("text {}", i), "a.md", 0.8))
            .collect();
        let index = StubIndex {
            similar,
            diverse: vec![chunk("d1", "unused", "b.md", 0.99)],
            delay: None,
        };
        let result = retriever(Arc::new(FixedEmbedder), index)
            .retrieve("query", 5)
            .await;
        assert_eq!(result.strategy, Strategy::Similarity);
        assert!(result.chunks.iter().all(|c| c.id.starts_with('s')));
    }

    #[tokio::test]
    async fn empty_index_scores_zero() {
        let index = StubIndex {
            similar: Vec::new(),
            diverse: Vec::new(),
            delay: None,
        };
        let result = retriever(Arc::new(FixedEmbedder), index)
            .retrieve("anything", 5)
            .await;
        assert!(result.chunks.is_empty());
        assert_eq!(result.quality_score, 0.0);
        assert!(!result.index_unavailable);
    }

    #[tokio::test]
    async fn slow_index_degrades_to_unavailable() {
        let index = StubIndex {
            similar: vec![chunk("s1", "text", "a", 0.9)],
            diverse: Vec::new(),
            delay: Some(Duration::from_secs(5)),
        };
        let result = retriever(Arc::new(FixedEmbedder), index)
            .retrieve("query", 5)
            .await;
        assert!(result.index_unavailable);
        assert!(result.chunks.is_empty());
        assert_eq!(result.quality_score, 0.0);
    }

    #[tokio::test]
    async fn embedder_failure_degrades_to_unavailable() {
        let index = StubIndex {
            similar: vec![chunk("s1", "text", "a", 0.9)],
            diverse: Vec::new(),
            delay: None,
        };
        let result = retriever(Arc::new(FailingEmbedder), index)
            .retrieve("query", 5)
            .await;
        assert!(result.index_unavailable);
    }

    #[tokio::test]
    async fn explicit_diversity_method_uses_diversity_mode() {
        let index = StubIndex {
            similar: vec![chunk("s1", "text", "a", 0.9)],
            diverse: vec![chunk("d1", "other", "b", 0.3)],
            delay: None,
        };
        let result = retriever(Arc::new(FixedEmbedder), index)
            .retrieve_with("query", 5, RetrievalMethod::Diversity)
            .await;
        assert_eq!(result.strategy, Strategy::Diversity);
        assert_eq!(result.chunks[0].id, "d1");
    }
}

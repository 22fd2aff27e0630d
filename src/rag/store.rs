//! EmbeddingIndex trait: the retrieval engine's view of the vector store.
//!
//! The engine depends only on this contract; how chunks get into the index
//! is somebody else's job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::Chunk;
use crate::core::errors::EngineError;

/// Ranking mode requested from the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Top-k by embedding similarity.
    Similarity,
    /// Relevance balanced against redundancy (MMR).
    Diversity,
}

/// A chunk as written into the index, before any query has scored it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk_id: String,
    pub content: String,
    pub source: String,
}

impl IndexedChunk {
    pub fn new(
        chunk_id: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            content: content.into(),
            source: source.into(),
        }
    }
}

#[async_trait]
pub trait EmbeddingIndex: Send + Sync {
    /// Return up to `k` chunks ordered best-first for `mode`.
    ///
    /// In diversity mode the order is the MMR selection order and
    /// `embedding_score` is still the plain query similarity.
    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        mode: SearchMode,
    ) -> Result<Vec<Chunk>, EngineError>;

    async fn count(&self) -> Result<usize, EngineError>;
}

//! SQLite-backed embedding index.
//!
//! In-process vector store using SQLite for chunk rows and
//! brute-force cosine similarity / MMR for search.

use std::cmp::Ordering;
use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{EmbeddingIndex, IndexedChunk, SearchMode};
use super::types::Chunk;
use crate::core::config::{AppPaths, RetrievalConfig};
use crate::core::errors::EngineError;
use crate::vector_math::{cosine_or_zero, mmr_select};

pub struct SqliteVectorIndex {
    pool: SqlitePool,
    db_path: PathBuf,
    mmr_lambda: f64,
    mmr_fetch_k: usize,
}

struct ScoredRow {
    chunk: Chunk,
    embedding: Vec<f32>,
}

impl SqliteVectorIndex {
    pub async fn new(paths: &AppPaths, retrieval: &RetrievalConfig) -> Result<Self, EngineError> {
        Self::with_path(paths.index_db_path.clone())
            .await
            .map(|index| index.with_mmr(retrieval.mmr_lambda, retrieval.mmr_fetch_k))
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, EngineError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(EngineError::storage)?;

        let index = Self {
            pool,
            db_path,
            mmr_lambda: 0.5,
            mmr_fetch_k: 20,
        };
        index.init_schema().await?;
        Ok(index)
    }

    pub fn with_mmr(mut self, lambda: f64, fetch_k: usize) -> Self {
        self.mmr_lambda = lambda.clamp(0.0, 1.0);
        self.mmr_fetch_k = fetch_k.max(1);
        self
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), EngineError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(EngineError::storage)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    pub async fn insert(&self, chunk: IndexedChunk, embedding: Vec<f32>) -> Result<(), EngineError> {
        self.insert_batch(vec![(chunk, embedding)]).await
    }

    pub async fn insert_batch(
        &self,
        items: Vec<(IndexedChunk, Vec<f32>)>,
    ) -> Result<(), EngineError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(EngineError::storage)?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            sqlx::query(
                "INSERT OR REPLACE INTO index_chunks (chunk_id, content, source, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(EngineError::storage)?;
        }

        tx.commit().await.map_err(EngineError::storage)?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), EngineError> {
        sqlx::query("DELETE FROM index_chunks")
            .execute(&self.pool)
            .await
            .map_err(EngineError::storage)?;
        Ok(())
    }

    /// All rows scored against the query, best first.
    async fn scored_rows(&self, query_embedding: &[f32]) -> Result<Vec<ScoredRow>, EngineError> {
        let rows = sqlx::query(
            "SELECT chunk_id, content, source, embedding
             FROM index_chunks
             ORDER BY created_at ASC, chunk_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::storage)?;

        let mut scored: Vec<ScoredRow> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let embedding = Self::deserialize_embedding(&embedding_bytes);
                let score = cosine_or_zero(query_embedding, &embedding);

                Some(ScoredRow {
                    chunk: Chunk {
                        id: row.get("chunk_id"),
                        content: row.get("content"),
                        source: row.get("source"),
                        embedding_score: score,
                    },
                    embedding,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.chunk
                .embedding_score
                .partial_cmp(&a.chunk.embedding_score)
                .unwrap_or(Ordering::Equal)
        });
        Ok(scored)
    }
}

#[async_trait]
impl EmbeddingIndex for SqliteVectorIndex {
    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        mode: SearchMode,
    ) -> Result<Vec<Chunk>, EngineError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut scored = self.scored_rows(query_embedding).await?;

        match mode {
            SearchMode::Similarity => {
                scored.truncate(k);
                Ok(scored.into_iter().map(|row| row.chunk).collect())
            }
            SearchMode::Diversity => {
                scored.truncate(self.mmr_fetch_k.max(k));
                let embeddings: Vec<Vec<f32>> =
                    scored.iter().map(|row| row.embedding.clone()).collect();
                let picked = mmr_select(query_embedding, &embeddings, k, self.mmr_lambda);
                Ok(picked
                    .into_iter()
                    .map(|idx| scored[idx].chunk.clone())
                    .collect())
            }
        }
    }

    async fn count(&self) -> Result<usize, EngineError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM index_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(EngineError::storage)?;
        let count: i64 = row.get("cnt");
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_index() -> (tempfile::TempDir, SqliteVectorIndex) {
        let dir = tempfile::tempdir().unwrap();
        let index = SqliteVectorIndex::with_path(dir.path().join("index.db"))
            .await
            .unwrap();
        (dir, index)
    }

    #[tokio::test]
    async fn insert_and_similarity_search() {
        let (_dir, index) = test_index().await;

        index
            .insert_batch(vec![
                (IndexedChunk::new("c1", "Present perfect uses have + past participle", "grammar.md"), vec![1.0, 0.0, 0.0]),
                (IndexedChunk::new("c2", "Passive voice moves the object forward", "grammar.md"), vec![0.0, 1.0, 0.0]),
                (IndexedChunk::new("c3", "Present perfect with since and for", "tenses.md"), vec![0.9, 0.1, 0.0]),
            ])
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 3);

        let results = index
            .search(&[1.0, 0.0, 0.0], 2, SearchMode::Similarity)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "c1");
        assert_eq!(results[1].id, "c3");
        assert!(results[0].embedding_score > 0.99);
    }

    #[tokio::test]
    async fn diversity_search_skips_near_duplicates() {
        let (_dir, index) = test_index().await;
        let index = index.with_mmr(0.3, 10);

        index
            .insert_batch(vec![
                (IndexedChunk::new("a", "first", "one"), vec![1.0, 0.1]),
                (IndexedChunk::new("b", "twin of first", "one"), vec![1.0, 0.11]),
                (IndexedChunk::new("c", "something else", "two"), vec![0.3, 1.0]),
            ])
            .await
            .unwrap();

        let results = index
            .search(&[1.0, 0.0], 2, SearchMode::Diversity)
            .await
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn empty_index_returns_nothing() {
        let (_dir, index) = test_index().await;
        let results = index
            .search(&[1.0, 0.0], 5, SearchMode::Similarity)
            .await
            .unwrap();
        assert!(results.is_empty());

        index
            .insert(IndexedChunk::new("x", "text", "doc"), vec![1.0, 0.0])
            .await
            .unwrap();
        index.clear().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }
}

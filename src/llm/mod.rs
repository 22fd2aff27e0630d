//! Embedding and generation collaborators.

pub mod ollama;

use async_trait::async_trait;

use crate::core::errors::EngineError;

pub use ollama::OllamaClient;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed each input text; the output has one vector per input, in order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EngineError>;

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, EngineError> {
        self.embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::collaborator("embedder returned no vector"))
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// return the model name used in logs and health output
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, EngineError>;
}

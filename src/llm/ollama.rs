use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{Embedder, LanguageModel};
use crate::core::config::CollaboratorConfig;
use crate::core::errors::EngineError;

/// Ollama HTTP client serving both embeddings and completions.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    embedding_model: String,
    llm_model: String,
    client: Client,
}

impl OllamaClient {
    pub fn new(base_url: String, embedding_model: String, llm_model: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            embedding_model,
            llm_model,
            client: Client::new(),
        }
    }

    pub fn from_config(config: &CollaboratorConfig) -> Self {
        Self::new(
            config.ollama_url.clone(),
            config.embedding_model.clone(),
            config.llm_model.clone(),
        )
    }

    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(3))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/api/embed", self.base_url);

        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(EngineError::collaborator)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(EngineError::Collaborator(format!("Ollama embed error: {}", text)));
        }

        let payload: EmbedResponse = res.json().await.map_err(EngineError::collaborator)?;
        if payload.embeddings.len() != inputs.len() {
            return Err(EngineError::Collaborator(format!(
                "Ollama returned {} embeddings for {} inputs",
                payload.embeddings.len(),
                inputs.len()
            )));
        }

        Ok(payload.embeddings)
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn name(&self) -> &str {
        &self.llm_model
    }

    async fn generate(&self, prompt: &str) -> Result<String, EngineError> {
        let url = format!("{}/api/generate", self.base_url);

        let body = json!({
            "model": self.llm_model,
            "prompt": prompt,
            "stream": false,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(EngineError::collaborator)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(EngineError::Collaborator(format!("Ollama generate error: {}", text)));
        }

        let payload: GenerateResponse = res.json().await.map_err(EngineError::collaborator)?;
        Ok(payload.response.trim().to_string())
    }
}

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use grammar_rag::core::config::EngineConfig;
use grammar_rag::core::errors::EngineError;
use grammar_rag::llm::{Embedder, LanguageModel};
use grammar_rag::rag::{Chunk, EmbeddingIndex, SearchMode, WebResult};
use grammar_rag::search::WebSearch;

pub struct FixedEmbedder;

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
        Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

/// Returns the same chunks for every query, or fails when `chunks` is None.
pub struct FixedIndex {
    pub chunks: Option<Vec<Chunk>>,
}

impl FixedIndex {
    pub fn with(chunks: Vec<Chunk>) -> Arc<Self> {
        Arc::new(Self {
            chunks: Some(chunks),
        })
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self { chunks: None })
    }
}

#[async_trait]
impl EmbeddingIndex for FixedIndex {
    async fn search(
        &self,
        _embedding: &[f32],
        k: usize,
        _mode: SearchMode,
    ) -> Result<Vec<Chunk>, EngineError> {
        match &self.chunks {
            Some(chunks) => Ok(chunks.iter().take(k).cloned().collect()),
            None => Err(EngineError::storage("index offline")),
        }
    }

    async fn count(&self) -> Result<usize, EngineError> {
        match &self.chunks {
            Some(chunks) => Ok(chunks.len()),
            None => Err(EngineError::storage("index offline")),
        }
    }
}

/// Web collaborator that records the queries it receives.
pub struct RecordingSearch {
    pub results: Vec<WebResult>,
    pub delay: Option<Duration>,
    pub queries: Mutex<Vec<String>>,
}

impl RecordingSearch {
    pub fn new(results: Vec<WebResult>) -> Arc<Self> {
        Arc::new(Self {
            results,
            delay: None,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(results: Vec<WebResult>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            results,
            delay: Some(delay),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for RecordingSearch {
    fn name(&self) -> &str {
        "recording"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, EngineError> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}

pub struct StubLlm {
    pub reply: Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubLlm {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(reason.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LanguageModel for StubLlm {
    fn name(&self) -> &str {
        "stub-llm"
    }

    async fn generate(&self, prompt: &str) -> Result<String, EngineError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(EngineError::collaborator)
    }
}

pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.collaborators.web_timeout_ms = 100;
    config.collaborators.index_timeout_ms = 1_000;
    config.collaborators.llm_timeout_secs = 5;
    config
}

/// Five chunks from one document: full coverage, no source diversity.
pub fn single_source_chunks() -> Vec<Chunk> {
    [
        "The present perfect is formed with have or has plus the past participle.",
        "Use it for experiences without a specific time: I have visited Rome.",
        "Signal words include already, yet, ever, never and since.",
        "Contrast with the simple past when a finished time is named.",
        "Negatives insert not after the auxiliary: she has not finished.",
    ]
    .iter()
    .enumerate()
    .map(|(i, text)| Chunk::new(format!("pp-{}", i), *text, "present_perfect.md", 0.9))
    .collect()
}

/// Five strong chunks from five documents.
pub fn diverse_chunks() -> Vec<Chunk> {
    let topics = ["articles", "tenses", "clauses", "modals", "prepositions"];
    topics
        .iter()
        .enumerate()
        .map(|(i, topic)| {
            Chunk::new(
                format!("{}-{}", topic, i),
                format!("Reference entry about {} number {}.", topic, i),
                format!("{}.md", topic),
                0.8,
            )
        })
        .collect()
}

pub fn wiki_hit() -> WebResult {
    WebResult {
        title: "Present perfect".to_string(),
        snippet: "The present perfect is a grammatical combination of the present tense \
                  and perfect aspect used to express a past event with present relevance."
            .to_string(),
        url: "https://en.wikipedia.org/wiki/Present_perfect".to_string(),
        source_domain: "en.wikipedia.org".to_string(),
        credibility_score: 0.9,
    }
}

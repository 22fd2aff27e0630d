//! One question/answer exchange, end to end.
//!
//! memory → retrieval → quality gate → (web fusion) → assembly → LLM →
//! turn recorded back into memory.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::config::EngineConfig;
use crate::core::errors::{with_deadline, EngineError};
use crate::llm::{Embedder, LanguageModel};
use crate::memory::{ConversationTurn, SessionMemory};
use crate::rag::{
    ContextAssembler, EmbeddingIndex, FusedContext, QualityReport, QualityScorer,
    RetrievalMethod, RetrievalResult, StrategyRetriever, WebFusion, WebOutcome,
};
use crate::search::WebSearch;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub query: String,
    #[serde(default = "default_true")]
    pub use_memory: bool,
    #[serde(default = "default_true")]
    pub use_web: bool,
    /// Supplement with web results even when local quality is good.
    #[serde(default)]
    pub force_web: bool,
    #[serde(default)]
    pub method: RetrievalMethod,
    /// Overrides `retrieval.k` for this request.
    #[serde(default)]
    pub k: Option<usize>,
}

impl AnswerRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            use_memory: true,
            use_web: true,
            force_web: false,
            method: RetrievalMethod::Enhanced,
            k: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PreparedContext {
    pub query: String,
    /// Query sent to the index, possibly extended from memory.
    pub retrieval_query: String,
    pub retrieval: RetrievalResult,
    pub quality: QualityReport,
    pub recommendations: Vec<String>,
    pub web_attempted: bool,
    pub fused: FusedContext,
    pub memory_turns: Vec<ConversationTurn>,
    pub memory_unavailable: bool,
    pub warnings: Vec<String>,
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub response: String,
    pub turn_id: Option<String>,
    pub context: PreparedContext,
}

pub struct RagPipeline {
    retriever: StrategyRetriever,
    fusion: WebFusion,
    assembler: ContextAssembler,
    llm: Arc<dyn LanguageModel>,
    threshold: f64,
    max_memory_turns: usize,
    llm_timeout: Duration,
}

impl RagPipeline {
    pub fn new(
        config: &EngineConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn EmbeddingIndex>,
        search: Option<Arc<dyn WebSearch>>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        let scorer = QualityScorer::new(config.scoring.clone());
        let collaborators = &config.collaborators;
        Self {
            retriever: StrategyRetriever::new(
                embedder,
                index,
                scorer.clone(),
                config.retrieval.clone(),
                Duration::from_millis(collaborators.index_timeout_ms),
            ),
            fusion: WebFusion::new(
                config.fusion.clone(),
                scorer,
                search,
                Duration::from_millis(collaborators.web_timeout_ms),
            ),
            assembler: ContextAssembler::new(config.assembler.clone()),
            llm,
            threshold: config.scoring.threshold,
            max_memory_turns: config.memory.max_turns,
            llm_timeout: Duration::from_secs(collaborators.llm_timeout_secs),
        }
    }

    pub fn retriever(&self) -> &StrategyRetriever {
        &self.retriever
    }

    pub fn llm_name(&self) -> &str {
        self.llm.name()
    }

    /// Run everything up to the assembled prompt. Never fails; every
    /// unavailable collaborator shows up as a flag or warning instead.
    pub async fn prepare(
        &self,
        session: Option<&SessionMemory>,
        request: &AnswerRequest,
    ) -> PreparedContext {
        let query = request.query.trim().to_string();
        let mut warnings = Vec::new();
        let mut memory_unavailable = false;
        let mut memory_turns = Vec::new();
        let mut retrieval_query = query.clone();

        if let Some(session) = session.filter(|_| request.use_memory) {
            let store = session.read().await;
            if let Some(warning) = store.load_warning() {
                memory_unavailable = true;
                warnings.push(warning.to_string());
            }
            memory_turns = store.relevant_context(&query, self.max_memory_turns);
            retrieval_query = store.augment_query(&query);
        }

        let k = request.k.unwrap_or_else(|| self.retriever.default_k());
        let retrieval = self
            .retriever
            .retrieve_with(&retrieval_query, k, request.method)
            .await;
        if retrieval.index_unavailable {
            warnings.push("embedding index unavailable; answering without local documents".to_string());
        }

        let quality = self.retriever.scorer().report(&retrieval.chunks);
        let needs_web = request.force_web || quality.needs_supplement(self.threshold);
        let web_attempted = request.use_web && needs_web;

        let fused = if web_attempted {
            tracing::info!(
                score = quality.score,
                threshold = self.threshold,
                forced = request.force_web,
                "Supplementing local results with web search"
            );
            self.fusion.supplement(&retrieval, &retrieval_query).await
        } else {
            self.fusion.fuse(&retrieval, WebOutcome::NotRequested)
        };
        if fused.web_unavailable {
            warnings.push("web search unavailable; using local results only".to_string());
        }

        let prompt = self.assembler.assemble(&memory_turns, &fused, &query);

        PreparedContext {
            recommendations: quality.recommendations(),
            query,
            retrieval_query,
            retrieval,
            quality,
            web_attempted,
            fused,
            memory_turns,
            memory_unavailable,
            warnings,
            prompt,
        }
    }

    /// Prepare, generate, and record the turn. Only a language-model
    /// failure is returned as an error.
    pub async fn answer(
        &self,
        session: Option<&SessionMemory>,
        request: &AnswerRequest,
    ) -> Result<AnswerOutcome, EngineError> {
        let mut context = self.prepare(session, request).await;

        let response = with_deadline(
            "language model",
            self.llm_timeout,
            self.llm.generate(&context.prompt),
        )
        .await?;

        let mut turn_id = None;
        if let Some(session) = session.filter(|_| request.use_memory) {
            let doc_ids: BTreeSet<String> = context.fused.doc_ids().into_iter().collect();
            let mut store = session.write().await;
            let turn = store.new_turn(&context.query, &response, doc_ids);
            turn_id = Some(turn.turn_id.clone());
            if let Err(err) = store.append(turn).await {
                tracing::warn!(session = %session.id, "Failed to persist turn: {}", err);
                context.memory_unavailable = true;
                context.warnings.push(err.to_string());
            }
        }

        Ok(AnswerOutcome {
            response,
            turn_id,
            context,
        })
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::{AppPaths, ConfigService, EngineConfig, MemoryBackend};
use crate::llm::{Embedder, LanguageModel, OllamaClient};
use crate::memory::{LogBackend, SessionRegistry, SqliteTurnStore};
use crate::pipeline::RagPipeline;
use crate::rag::{EmbeddingIndex, SqliteVectorIndex};
use crate::search::{MultiEngineSearch, WebSearch};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Collaborator handles are built once here and reused for every request;
/// each conversation gets its own memory through `sessions`.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<EngineConfig>,
    pub pipeline: Arc<RagPipeline>,
    pub sessions: Arc<SessionRegistry>,
    pub index: Arc<dyn EmbeddingIndex>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// 1. Loading and validating configuration (fatal on error)
    /// 2. Opening the embedding index
    /// 3. Building the web search and Ollama collaborators
    /// 4. Opening the conversation memory backend
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone())
            .load_config()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let index: Arc<dyn EmbeddingIndex> = Arc::new(
            SqliteVectorIndex::new(paths.as_ref(), &config.retrieval)
                .await
                .map_err(|e| InitializationError::Index(e.into()))?,
        );

        let ollama = Arc::new(OllamaClient::from_config(&config.collaborators));
        if !ollama.health_check().await {
            tracing::warn!(
                "Ollama not reachable at {}; requests will fail until it is up",
                config.collaborators.ollama_url
            );
        }

        let multi = MultiEngineSearch::from_config(&config.collaborators, &config.fusion);
        tracing::info!(engines = ?multi.engine_names(), "Web search configured");
        let search: Arc<dyn WebSearch> = Arc::new(multi);

        let backend = match config.memory.backend {
            MemoryBackend::Jsonl => LogBackend::Jsonl(paths.memory_dir.clone()),
            MemoryBackend::Sqlite => LogBackend::Sqlite(
                SqliteTurnStore::new(paths.memory_db_path.clone())
                    .await
                    .map_err(|e| InitializationError::Memory(e.into()))?,
            ),
        };

        Ok(Self::from_parts(
            paths,
            config,
            ollama.clone(),
            index,
            Some(search),
            ollama,
            backend,
        ))
    }

    /// Assemble state from explicit collaborators.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: EngineConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn EmbeddingIndex>,
        search: Option<Arc<dyn WebSearch>>,
        llm: Arc<dyn LanguageModel>,
        backend: LogBackend,
    ) -> Arc<Self> {
        let pipeline = RagPipeline::new(&config, embedder, index.clone(), search, llm);
        let sessions = SessionRegistry::new(config.memory.clone(), backend);

        Arc::new(AppState {
            paths,
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            sessions: Arc::new(sessions),
            index,
            started_at: Utc::now(),
        })
    }
}

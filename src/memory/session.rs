//! Session lifecycle: each conversation owns its own memory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::log::{JsonlTurnLog, TurnLog};
use super::sqlite::SqliteTurnStore;
use super::store::MemoryStore;
use crate::core::config::MemoryConfig;
use crate::core::errors::EngineError;

/// Where session logs are persisted.
#[derive(Clone)]
pub enum LogBackend {
    Jsonl(PathBuf),
    Sqlite(SqliteTurnStore),
    /// Nothing is persisted.
    Ephemeral,
}

impl LogBackend {
    fn open(&self, session_id: &str) -> Option<Arc<dyn TurnLog>> {
        match self {
            LogBackend::Jsonl(dir) => Some(Arc::new(JsonlTurnLog::for_session(dir, session_id))),
            LogBackend::Sqlite(store) => Some(Arc::new(store.session_log(session_id))),
            LogBackend::Ephemeral => None,
        }
    }
}

pub struct SessionMemory {
    pub id: String,
    pub created_at: DateTime<Utc>,
    store: RwLock<MemoryStore>,
}

impl SessionMemory {
    pub fn new(id: impl Into<String>, store: MemoryStore) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            store: RwLock::new(store),
        }
    }

    /// Shared access; many readers may hold it at once.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, MemoryStore> {
        self.store.read().await
    }

    /// Exclusive access; appends and clears go through here one at a time.
    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, MemoryStore> {
        self.store.write().await
    }
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionMemory>>>,
    config: MemoryConfig,
    backend: LogBackend,
}

impl SessionRegistry {
    pub fn new(config: MemoryConfig, backend: LogBackend) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
            backend,
        }
    }

    /// Open a session, resuming its persisted log when one exists.
    ///
    /// A corrupted log does not fail the call: the session starts empty and
    /// its store carries a `load_warning`.
    pub async fn open(&self, session_id: Option<String>) -> Result<Arc<SessionMemory>, EngineError> {
        let id = match session_id {
            Some(id) => validate_session_id(&id)?,
            None => uuid::Uuid::new_v4().to_string(),
        };

        if let Some(existing) = self.sessions.read().await.get(&id) {
            return Ok(existing.clone());
        }

        let store = match self.backend.open(&id) {
            None => MemoryStore::in_memory(self.config.clone()),
            Some(log) => match MemoryStore::load(self.config.clone(), log.clone()).await {
                Ok(store) => {
                    tracing::info!(session = %id, turns = store.len(), log = %log.describe(), "Session memory loaded");
                    store
                }
                Err(err) => self.recover(&id, log, err).await,
            },
        };

        let session = Arc::new(SessionMemory::new(id.clone(), store));

        let mut sessions = self.sessions.write().await;
        // another caller may have opened it while the log was loading
        let entry = sessions.entry(id).or_insert(session);
        Ok(entry.clone())
    }

    /// Start empty after a failed load. The unreadable records are moved
    /// aside so new turns land in a log that loads again; if that fails the
    /// session runs without persistence.
    async fn recover(&self, id: &str, log: Arc<dyn TurnLog>, err: EngineError) -> MemoryStore {
        match log.quarantine().await {
            Ok(moved_to) => {
                tracing::warn!(session = %id, moved_to = %moved_to, "Starting with empty memory: {}", err);
                MemoryStore::with_log(self.config.clone(), log)
                    .with_load_warning(format!("{}; unreadable log moved to {}", err, moved_to))
            }
            Err(move_err) => {
                tracing::warn!(
                    session = %id,
                    "Starting with unpersisted memory: {}; {}",
                    err,
                    move_err
                );
                MemoryStore::in_memory(self.config.clone()).with_load_warning(format!(
                    "{}; new turns will not be persisted ({})",
                    err, move_err
                ))
            }
        }
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<SessionMemory>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Forget the in-process session; its persisted log is kept.
    pub async fn close(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn validate_session_id(id: &str) -> Result<String, EngineError> {
    let id = id.trim();
    let valid = !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(EngineError::config(format!(
            "Invalid session id '{}': use 1-64 letters, digits, '-' or '_'",
            id
        )));
    }
    Ok(id.to_string())
}

//! SQLite conversation log: one row per turn, JSON payload, insertion order.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use super::log::TurnLog;
use super::turn::ConversationTurn;
use crate::core::errors::EngineError;

/// Shared database handle; hands out per-session logs.
#[derive(Clone)]
pub struct SqliteTurnStore {
    pool: SqlitePool,
}

impl SqliteTurnStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, EngineError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| EngineError::storage(format!("Failed to connect to memory db: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS conversation_turns (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                turn_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| EngineError::storage(format!("Failed to init turns table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_turns_session ON conversation_turns(session_id, seq)",
        )
        .execute(&pool)
        .await
        .map_err(|e| EngineError::storage(format!("Failed to create index: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn session_log(&self, session_id: &str) -> SqliteTurnLog {
        SqliteTurnLog {
            pool: self.pool.clone(),
            session_id: session_id.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) async fn corrupt_payloads_for_tests(&self, session_id: &str) {
        sqlx::query("UPDATE conversation_turns SET payload = '{broken' WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .unwrap();
    }
}

pub struct SqliteTurnLog {
    pool: SqlitePool,
    session_id: String,
}

#[async_trait]
impl TurnLog for SqliteTurnLog {
    async fn load(&self) -> Result<Vec<ConversationTurn>, EngineError> {
        let rows = sqlx::query(
            "SELECT seq, payload FROM conversation_turns WHERE session_id = ? ORDER BY seq ASC",
        )
        .bind(&self.session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::memory)?;

        rows.iter()
            .map(|row| {
                let seq: i64 = row.get("seq");
                let payload: String = row.get("payload");
                serde_json::from_str::<ConversationTurn>(&payload).map_err(|e| {
                    EngineError::MemoryUnavailable(format!("turn row {}: {}", seq, e))
                })
            })
            .collect()
    }

    async fn append(&self, turn: &ConversationTurn) -> Result<(), EngineError> {
        let payload = serde_json::to_string(turn).map_err(EngineError::memory)?;
        sqlx::query(
            "INSERT INTO conversation_turns (session_id, turn_id, payload) VALUES (?, ?, ?)",
        )
        .bind(&self.session_id)
        .bind(&turn.turn_id)
        .bind(&payload)
        .execute(&self.pool)
        .await
        .map_err(EngineError::memory)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), EngineError> {
        sqlx::query("DELETE FROM conversation_turns WHERE session_id = ?")
            .bind(&self.session_id)
            .execute(&self.pool)
            .await
            .map_err(EngineError::memory)?;
        Ok(())
    }

    async fn quarantine(&self) -> Result<String, EngineError> {
        // session ids never contain '.', so the moved rows can't be reopened
        let parked = format!(
            "{}.corrupt-{}",
            self.session_id,
            Utc::now().format("%Y%m%dT%H%M%S%.3f")
        );
        sqlx::query("UPDATE conversation_turns SET session_id = ? WHERE session_id = ?")
            .bind(&parked)
            .bind(&self.session_id)
            .execute(&self.pool)
            .await
            .map_err(EngineError::memory)?;
        Ok(format!("sqlite:{}", parked))
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.session_id)
    }
}

//! Durable, append-only conversation logs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::turn::ConversationTurn;
use crate::core::errors::EngineError;

#[async_trait]
pub trait TurnLog: Send + Sync {
    /// Every persisted turn in append order.
    async fn load(&self) -> Result<Vec<ConversationTurn>, EngineError>;

    async fn append(&self, turn: &ConversationTurn) -> Result<(), EngineError>;

    /// Drop all persisted turns.
    async fn clear(&self) -> Result<(), EngineError>;

    /// Move unreadable records out of the way so future appends start a
    /// clean log. Returns where the old records went.
    async fn quarantine(&self) -> Result<String, EngineError>;

    fn describe(&self) -> String;
}

/// One JSON record per line.
pub struct JsonlTurnLog {
    path: PathBuf,
}

impl JsonlTurnLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn for_session(dir: &Path, session_id: &str) -> Self {
        Self::new(dir.join(format!("{}.jsonl", session_id)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TurnLog for JsonlTurnLog {
    async fn load(&self) -> Result<Vec<ConversationTurn>, EngineError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(EngineError::MemoryUnavailable(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    err
                )))
            }
        };

        let mut turns = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let turn = serde_json::from_str::<ConversationTurn>(line).map_err(|err| {
                EngineError::MemoryUnavailable(format!(
                    "{}:{}: {}",
                    self.path.display(),
                    line_no + 1,
                    err
                ))
            })?;
            turns.push(turn);
        }
        Ok(turns)
    }

    async fn append(&self, turn: &ConversationTurn) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(EngineError::memory)?;
        }
        let mut line = serde_json::to_string(turn).map_err(EngineError::memory)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(EngineError::memory)?;
        file.write_all(line.as_bytes())
            .await
            .map_err(EngineError::memory)?;
        file.flush().await.map_err(EngineError::memory)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), EngineError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(EngineError::memory(err)),
        }
    }

    async fn quarantine(&self) -> Result<String, EngineError> {
        let mut target = self.path.clone().into_os_string();
        target.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3f")));
        let target = PathBuf::from(target);
        match fs::rename(&self.path, &target).await {
            Ok(()) => Ok(target.display().to_string()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(self.path.display().to_string())
            }
            Err(err) => Err(EngineError::memory(format!(
                "failed to move {} aside: {}",
                self.path.display(),
                err
            ))),
        }
    }

    fn describe(&self) -> String {
        format!("jsonl:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn turn(query: &str) -> ConversationTurn {
        let keywords: BTreeSet<String> = [query.to_string()].into_iter().collect();
        ConversationTurn::new(query, format!("answer to {}", query), keywords, BTreeSet::new())
    }

    #[tokio::test]
    async fn appended_turns_round_trip_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlTurnLog::for_session(dir.path(), "s1");

        let turns: Vec<ConversationTurn> = ["one", "two", "three"].iter().map(|q| turn(q)).collect();
        for t in &turns {
            log.append(t).await.unwrap();
        }

        let loaded = JsonlTurnLog::for_session(dir.path(), "s1").load().await.unwrap();
        assert_eq!(loaded, turns);
    }

    #[tokio::test]
    async fn missing_file_loads_empty_and_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlTurnLog::for_session(dir.path(), "nobody");
        assert!(log.load().await.unwrap().is_empty());
        log.clear().await.unwrap();
        log.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupted_line_is_memory_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlTurnLog::for_session(dir.path(), "s1");
        log.append(&turn("fine")).await.unwrap();
        tokio::fs::write(
            log.path(),
            format!(
                "{}\n{{not json\n",
                serde_json::to_string(&turn("fine")).unwrap()
            ),
        )
        .await
        .unwrap();

        let err = log.load().await.unwrap_err();
        assert!(matches!(err, EngineError::MemoryUnavailable(msg) if msg.contains(":2:")));
    }

    #[tokio::test]
    async fn quarantine_moves_the_file_aside() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlTurnLog::for_session(dir.path(), "s1");
        tokio::fs::write(log.path(), "{not json\n").await.unwrap();

        let moved = log.quarantine().await.unwrap();
        assert!(moved.contains("s1.jsonl.corrupt-"));
        assert!(std::path::Path::new(&moved).is_file());
        assert!(log.load().await.unwrap().is_empty());

        log.append(&turn("after")).await.unwrap();
        assert_eq!(log.load().await.unwrap().len(), 1);
    }
}

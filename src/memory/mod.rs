//! Conversation memory: turns, keyword extraction, persistence and sessions.

pub mod keywords;
pub mod log;
pub mod session;
pub mod sqlite;
pub mod store;
pub mod turn;

pub use keywords::KeywordExtractor;
pub use log::{JsonlTurnLog, TurnLog};
pub use session::{LogBackend, SessionMemory, SessionRegistry};
pub use sqlite::{SqliteTurnLog, SqliteTurnStore};
pub use store::{ExportFormat, MemoryStats, MemoryStore, TopicCount};
pub use turn::ConversationTurn;

//! Retrieval decision engine: strategy retrieval, quality scoring,
//! web fusion and context assembly.

pub mod context_builder;
pub mod engine;
pub mod fusion;
pub mod quality;
pub mod similarity;
pub mod sqlite;
pub mod store;
pub mod types;

pub use context_builder::ContextAssembler;
pub use engine::{merge_strategies, StrategyRetriever};
pub use fusion::{augment_query, web_composite_score, WebFusion, WebOutcome};
pub use quality::{QualityReport, QualityScorer};
pub use sqlite::SqliteVectorIndex;
pub use store::{EmbeddingIndex, IndexedChunk, SearchMode};
pub use types::{
    Chunk, Evidence, FusedContext, FusedItem, RetrievalMethod, RetrievalResult, Strategy,
    WebResult,
};

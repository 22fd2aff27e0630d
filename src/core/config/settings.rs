//! Typed configuration sections consumed by the retrieval engine.
//!
//! Every tunable that affects scoring or truncation lives here; the
//! components read it from these structs instead of carrying literals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub retrieval: RetrievalConfig,
    pub scoring: ScoringConfig,
    pub fusion: FusionConfig,
    pub memory: MemoryConfig,
    pub assembler: AssemblerConfig,
    pub collaborators: CollaboratorConfig,
    pub server: ServerConfig,
}

/// Strategy Retriever settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks requested from each strategy
    pub k: usize,
    /// Below this many similarity hits the diversity lookup is merged in
    pub min_similarity_results: usize,
    /// Relevance/diversity trade-off for MMR (1.0 = pure relevance)
    pub mmr_lambda: f64,
    /// Candidate pool the MMR selection draws from
    pub mmr_fetch_k: usize,
    /// Issue both strategies at once instead of diversity-on-demand
    pub concurrent_strategies: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 5,
            min_similarity_results: 3,
            mmr_lambda: 0.5,
            mmr_fetch_k: 20,
            concurrent_strategies: false,
        }
    }
}

/// Quality Scorer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Scores below this ask for supplementary web evidence
    pub threshold: f64,
    /// Chunk count that earns full coverage
    pub target_count: usize,
    pub coverage_weight: f64,
    pub semantic_weight: f64,
    pub diversity_weight: f64,
    /// Lower bound of the index's similarity scores
    pub score_min: f64,
    /// Upper bound of the index's similarity scores
    pub score_max: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            threshold: 60.0,
            target_count: 5,
            coverage_weight: 1.0,
            semantic_weight: 1.0,
            diversity_weight: 1.0,
            score_min: 0.0,
            score_max: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Token Jaccard similarity at which two items count as duplicates
    pub dedup_threshold: f64,
    pub max_items: usize,
    pub content_length_weight: f64,
    pub credibility_weight: f64,
    pub relevance_weight: f64,
    /// Snippet length (chars) that earns a full content-length score
    pub content_length_target: usize,
    /// Web results shorter than this are discarded
    pub min_web_content_chars: usize,
    pub web_max_results: usize,
    pub augmentation: QueryAugmentation,
    pub credibility: CredibilityTable,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            dedup_threshold: 0.8,
            max_items: 8,
            content_length_weight: 0.5,
            credibility_weight: 0.3,
            relevance_weight: 0.2,
            content_length_target: 500,
            min_web_content_chars: 50,
            web_max_results: 4,
            augmentation: QueryAugmentation::default(),
            credibility: CredibilityTable::default(),
        }
    }
}

/// Rules for biasing web queries toward the learning domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryAugmentation {
    pub trigger_terms: Vec<String>,
    pub suffix: String,
    /// Only queries shorter than this (in chars) are extended
    pub max_query_chars: usize,
}

impl Default for QueryAugmentation {
    fn default() -> Self {
        Self {
            trigger_terms: defaults::trigger_terms(),
            suffix: "English grammar rules examples".to_string(),
            max_query_chars: 40,
        }
    }
}

/// Credibility by source domain. Lookups match the domain itself or any
/// parent domain listed in the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredibilityTable {
    pub default_score: f64,
    pub domains: BTreeMap<String, f64>,
}

impl Default for CredibilityTable {
    fn default() -> Self {
        Self {
            default_score: 0.5,
            domains: defaults::credible_domains(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryBackend {
    Jsonl,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_turns: usize,
    /// Turns must score strictly above this to be returned
    pub relevance_floor: f64,
    pub keyword_weight: f64,
    pub recency_weight: f64,
    pub augment_query: bool,
    pub max_augment_keywords: usize,
    pub backend: MemoryBackend,
    pub keywords: KeywordConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_turns: 3,
            relevance_floor: 0.05,
            keyword_weight: 0.7,
            recency_weight: 0.3,
            augment_query: true,
            max_augment_keywords: 3,
            backend: MemoryBackend::Jsonl,
            keywords: KeywordConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub domain_terms: Vec<String>,
    pub stop_words: Vec<String>,
    /// Also keep ordinary content words that survive stop-word filtering
    pub include_generic_terms: bool,
    pub min_term_chars: usize,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            domain_terms: defaults::grammar_terms(),
            stop_words: defaults::stop_words(),
            include_generic_terms: true,
            min_term_chars: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    pub max_chars: usize,
    pub max_history_chars: usize,
    pub max_item_chars: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_chars: 6000,
            max_history_chars: 2000,
            max_item_chars: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    pub ollama_url: String,
    pub embedding_model: String,
    pub llm_model: String,
    pub index_timeout_ms: u64,
    pub web_timeout_ms: u64,
    pub llm_timeout_secs: u64,
    pub web_engines: Vec<String>,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://127.0.0.1:11434".to_string(),
            embedding_model: "all-minilm".to_string(),
            llm_model: "llama3.1:8b".to_string(),
            index_timeout_ms: 5_000,
            web_timeout_ms: 10_000,
            llm_timeout_secs: 120,
            web_engines: vec!["duckduckgo".to_string(), "wikipedia".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_allowed_origins: Vec::new(),
        }
    }
}

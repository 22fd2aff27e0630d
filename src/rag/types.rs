//! Data model shared by the retrieval, fusion and assembly stages.

use serde::{Deserialize, Deserializer, Serialize};

use super::similarity::content_hash;

/// A unit of retrievable text returned by the embedding index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    /// Document or URL the chunk was cut from.
    pub source: String,
    /// Similarity reported by the index. `NaN` marks a missing value.
    #[serde(default = "missing_score", deserialize_with = "score_or_nan")]
    pub embedding_score: f32,
}

impl Chunk {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
        embedding_score: f32,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            source: source.into(),
            embedding_score,
        }
    }

    pub fn content_hash(&self) -> String {
        content_hash(&self.content)
    }
}

fn missing_score() -> f32 {
    f32::NAN
}

fn score_or_nan<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or(f32::NAN))
}

/// Which retrieval strategy produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    Similarity,
    Diversity,
    Fused,
}

impl Strategy {
    /// Merge priority: similarity hits win ties against diversity hits.
    pub fn priority(self) -> u8 {
        match self {
            Strategy::Similarity => 0,
            Strategy::Diversity => 1,
            Strategy::Fused => 2,
        }
    }
}

/// Retrieval method requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    Similarity,
    Diversity,
    /// Similarity first, diversity merged in when similarity comes up short.
    #[default]
    Enhanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub query: String,
    pub strategy: Strategy,
    pub chunks: Vec<Chunk>,
    pub quality_score: f64,
    /// Set when the embedder or index failed or timed out.
    #[serde(default)]
    pub index_unavailable: bool,
}

impl RetrievalResult {
    pub fn empty(query: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            query: query.into(),
            strategy,
            chunks: Vec::new(),
            quality_score: 0.0,
            index_unavailable: false,
        }
    }

    pub fn unavailable(query: impl Into<String>) -> Self {
        Self {
            index_unavailable: true,
            ..Self::empty(query, Strategy::Similarity)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// A single hit from the web search collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub source_domain: String,
    pub credibility_score: f64,
}

impl WebResult {
    /// Text used for length, relevance and duplicate checks.
    pub fn text(&self) -> String {
        if self.title.is_empty() {
            self.snippet.clone()
        } else {
            format!("{} {}", self.title, self.snippet)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum Evidence {
    Local(Chunk),
    Web(WebResult),
}

impl Evidence {
    /// Stable identifier recorded in `retrieved_doc_ids`.
    pub fn id(&self) -> &str {
        match self {
            Evidence::Local(chunk) => &chunk.id,
            Evidence::Web(result) => &result.url,
        }
    }

    pub fn text(&self) -> String {
        match self {
            Evidence::Local(chunk) => chunk.content.clone(),
            Evidence::Web(result) => result.text(),
        }
    }

    pub fn source_label(&self) -> &str {
        match self {
            Evidence::Local(chunk) => &chunk.source,
            Evidence::Web(result) => &result.source_domain,
        }
    }

    pub fn is_web(&self) -> bool {
        matches!(self, Evidence::Web(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedItem {
    pub evidence: Evidence,
    pub composite_score: f64,
}

/// Ranked, deduplicated evidence ready for assembly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FusedContext {
    pub items: Vec<FusedItem>,
    pub composite_score: f64,
    pub web_unavailable: bool,
    /// Query actually sent to the web collaborator, if any.
    pub web_query: Option<String>,
}

impl FusedContext {
    pub fn doc_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|item| item.evidence.id().to_string())
            .collect()
    }

    pub fn web_count(&self) -> usize {
        self.items.iter().filter(|item| item.evidence.is_web()).count()
    }
}

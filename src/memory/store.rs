//! Per-session conversation memory.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::keywords::{keyword_overlap_ratio, KeywordExtractor};
use super::log::TurnLog;
use super::turn::ConversationTurn;
use crate::core::config::MemoryConfig;
use crate::core::errors::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_turns: usize,
    pub top_topics: Vec<TopicCount>,
    pub avg_response_chars: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, Copy)]
struct TopicStat {
    count: usize,
    /// Sequence number of the last turn that mentioned the topic.
    last_seen: u64,
}

/// `weight_kw * overlap + weight_recency / (1 + hours_elapsed)`.
pub fn turn_relevance(
    query_keywords: &BTreeSet<String>,
    turn: &ConversationTurn,
    now: DateTime<Utc>,
    config: &MemoryConfig,
) -> f64 {
    let overlap = keyword_overlap_ratio(query_keywords, &turn.keywords);
    let recency = 1.0 / (1.0 + turn.hours_since(now));
    config.keyword_weight * overlap + config.recency_weight * recency
}

pub struct MemoryStore {
    config: MemoryConfig,
    extractor: KeywordExtractor,
    turns: Vec<ConversationTurn>,
    topics: HashMap<String, TopicStat>,
    next_seq: u64,
    log: Option<Arc<dyn TurnLog>>,
    /// Why the persisted log could not be loaded, until the next clear.
    load_warning: Option<String>,
}

impl MemoryStore {
    /// Memory that lives only as long as the process.
    pub fn in_memory(config: MemoryConfig) -> Self {
        Self {
            extractor: KeywordExtractor::new(&config.keywords),
            config,
            turns: Vec::new(),
            topics: HashMap::new(),
            next_seq: 0,
            log: None,
            load_warning: None,
        }
    }

    /// Empty store that persists future appends to `log`.
    pub fn with_log(config: MemoryConfig, log: Arc<dyn TurnLog>) -> Self {
        let mut store = Self::in_memory(config);
        store.log = Some(log);
        store
    }

    /// Rebuild a store from its persisted log.
    pub async fn load(config: MemoryConfig, log: Arc<dyn TurnLog>) -> Result<Self, EngineError> {
        let turns = log.load().await?;
        let mut store = Self::with_log(config, log);
        for turn in turns {
            store.apply(turn);
        }
        Ok(store)
    }

    pub fn with_load_warning(mut self, warning: impl Into<String>) -> Self {
        self.load_warning = Some(warning.into());
        self
    }

    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn extractor(&self) -> &KeywordExtractor {
        &self.extractor
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Build a turn for a finished exchange, keyworded from query and response.
    pub fn new_turn(
        &self,
        query: &str,
        response: &str,
        retrieved_doc_ids: BTreeSet<String>,
    ) -> ConversationTurn {
        let mut keywords = self.extractor.extract(query);
        keywords.extend(self.extractor.domain_terms(response));
        ConversationTurn::new(query, response, keywords, retrieved_doc_ids)
    }

    /// Record a turn. The in-memory state is updated even when persisting
    /// fails; the failure comes back as `MemoryUnavailable`.
    pub async fn append(&mut self, turn: ConversationTurn) -> Result<(), EngineError> {
        let persisted = match &self.log {
            Some(log) => log.append(&turn).await,
            None => Ok(()),
        };
        self.apply(turn);
        persisted
    }

    fn apply(&mut self, turn: ConversationTurn) {
        let seq = self.next_seq;
        self.next_seq += 1;
        for keyword in &turn.keywords {
            let stat = self.topics.entry(keyword.clone()).or_insert(TopicStat {
                count: 0,
                last_seen: seq,
            });
            stat.count += 1;
            stat.last_seen = seq;
        }
        self.turns.push(turn);
    }

    pub fn relevant_context(&self, query: &str, max_turns: usize) -> Vec<ConversationTurn> {
        self.relevant_context_at(query, max_turns, Utc::now())
    }

    /// Turns scoring above the relevance floor, most relevant first,
    /// ties going to the more recent turn.
    pub fn relevant_context_at(
        &self,
        query: &str,
        max_turns: usize,
        now: DateTime<Utc>,
    ) -> Vec<ConversationTurn> {
        self.scored_turns(query, now)
            .into_iter()
            .take(max_turns)
            .map(|(_, turn)| turn.clone())
            .collect()
    }

    pub fn scored_turns(&self, query: &str, now: DateTime<Utc>) -> Vec<(f64, &ConversationTurn)> {
        let query_keywords = self.extractor.extract(query);
        let mut scored: Vec<(f64, usize, &ConversationTurn)> = self
            .turns
            .iter()
            .enumerate()
            .map(|(idx, turn)| (turn_relevance(&query_keywords, turn, now, &self.config), idx, turn))
            .filter(|(score, _, _)| *score > self.config.relevance_floor)
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.2.timestamp.cmp(&a.2.timestamp))
                .then_with(|| b.1.cmp(&a.1))
        });
        scored.into_iter().map(|(score, _, turn)| (score, turn)).collect()
    }

    /// Most frequent topics, ties going to the most recently seen.
    pub fn top_topics(&self, n: usize) -> Vec<TopicCount> {
        let mut topics: Vec<(&String, &TopicStat)> = self.topics.iter().collect();
        topics.sort_by(|a, b| {
            b.1.count
                .cmp(&a.1.count)
                .then_with(|| b.1.last_seen.cmp(&a.1.last_seen))
                .then_with(|| a.0.cmp(b.0))
        });
        topics
            .into_iter()
            .take(n)
            .map(|(topic, stat)| TopicCount {
                topic: topic.clone(),
                count: stat.count,
            })
            .collect()
    }

    /// Extend a follow-up query that names no domain term with the domain
    /// keywords of the most relevant earlier turn.
    pub fn augment_query(&self, query: &str) -> String {
        self.augment_query_at(query, Utc::now())
    }

    pub fn augment_query_at(&self, query: &str, now: DateTime<Utc>) -> String {
        if !self.config.augment_query || !self.extractor.domain_terms(query).is_empty() {
            return query.to_string();
        }
        let Some((_, top)) = self.scored_turns(query, now).into_iter().next() else {
            return query.to_string();
        };
        let extra: Vec<&str> = top
            .keywords
            .iter()
            .filter(|k| self.extractor.is_domain_term(k))
            .take(self.config.max_augment_keywords)
            .map(String::as_str)
            .collect();
        if extra.is_empty() {
            return query.to_string();
        }
        tracing::debug!(added = ?extra, "Augmenting follow-up query from memory");
        format!("{} {}", query.trim(), extra.join(" "))
    }

    /// Discard all turns and topic counts, including the persisted log.
    /// A successful clear also drops any load warning.
    pub async fn clear(&mut self) -> Result<(), EngineError> {
        self.turns.clear();
        self.topics.clear();
        self.next_seq = 0;
        let cleared = match &self.log {
            Some(log) => log.clear().await,
            None => Ok(()),
        };
        if cleared.is_ok() {
            self.load_warning = None;
        }
        cleared
    }

    pub fn stats(&self) -> MemoryStats {
        let avg_response_chars = if self.turns.is_empty() {
            0.0
        } else {
            self.turns
                .iter()
                .map(|t| t.response.chars().count())
                .sum::<usize>() as f64
                / self.turns.len() as f64
        };
        MemoryStats {
            total_turns: self.turns.len(),
            top_topics: self.top_topics(5),
            avg_response_chars,
        }
    }

    pub fn export(&self, format: ExportFormat) -> Result<String, EngineError> {
        match format {
            ExportFormat::Json => {
                serde_json::to_string_pretty(&self.turns).map_err(EngineError::internal)
            }
            ExportFormat::Text => {
                let mut out = String::new();
                for (i, turn) in self.turns.iter().enumerate() {
                    out.push_str(&format!(
                        "#{} [{}]\nQ: {}\nA: {}\n",
                        i + 1,
                        turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        turn.query,
                        turn.response
                    ));
                    if !turn.keywords.is_empty() {
                        let keywords: Vec<&str> = turn.keywords.iter().map(String::as_str).collect();
                        out.push_str(&format!("Keywords: {}\n", keywords.join(", ")));
                    }
                    out.push('\n');
                }
                Ok(out)
            }
        }
    }
}

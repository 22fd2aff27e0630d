use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed exchange. Field names are the persisted log format;
/// unknown fields in older or newer records are ignored on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub turn_id: String,
    pub query: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default)]
    pub retrieved_doc_ids: BTreeSet<String>,
}

impl ConversationTurn {
    pub fn new(
        query: impl Into<String>,
        response: impl Into<String>,
        keywords: BTreeSet<String>,
        retrieved_doc_ids: BTreeSet<String>,
    ) -> Self {
        Self {
            turn_id: uuid::Uuid::new_v4().to_string(),
            query: query.into(),
            response: response.into(),
            timestamp: Utc::now(),
            keywords,
            retrieved_doc_ids,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Hours between this turn and `now`, never negative.
    pub fn hours_since(&self, now: DateTime<Utc>) -> f64 {
        let millis = (now - self.timestamp).num_milliseconds().max(0);
        millis as f64 / 3_600_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_are_ignored() {
        let line = r#"{"turn_id":"t1","query":"q","response":"r","timestamp":"2024-05-01T10:00:00Z","keywords":["tense"],"retrieved_doc_ids":[],"rating":5}"#;
        let turn: ConversationTurn = serde_json::from_str(line).unwrap();
        assert_eq!(turn.turn_id, "t1");
        assert!(turn.keywords.contains("tense"));
    }

    #[test]
    fn missing_sets_default_to_empty() {
        let line = r#"{"turn_id":"t1","query":"q","response":"r","timestamp":"2024-05-01T10:00:00Z"}"#;
        let turn: ConversationTurn = serde_json::from_str(line).unwrap();
        assert!(turn.keywords.is_empty());
        assert!(turn.retrieved_doc_ids.is_empty());
    }

    #[test]
    fn hours_since_is_clamped_at_zero() {
        let now = Utc::now();
        let turn = ConversationTurn::new("q", "r", BTreeSet::new(), BTreeSet::new())
            .with_timestamp(now + chrono::Duration::hours(2));
        assert_eq!(turn.hours_since(now), 0.0);
    }
}

//! Context Assembler.
//!
//! Formats conversation history, fused evidence and the user query into
//! the prompt handed to the language model:
//! 1. History section (bounded, every selected turn kept)
//! 2. Evidence section with citations, best item first
//! 3. The raw query
//!
//! When the total is too long, the lowest-scored evidence goes first. With
//! no evidence left the query is shortened, then the history.

use super::types::{Evidence, FusedContext, FusedItem};
use crate::core::config::AssemblerConfig;
use crate::memory::ConversationTurn;

const HISTORY_HEADER: &str = "## Conversation history\n";
const EVIDENCE_HEADER: &str = "## Reference material\n";
const QUESTION_HEADER: &str = "## Question\n";
/// The query is never cut below this while history can still give way.
const MIN_QUERY_CHARS: usize = 80;

pub struct ContextAssembler {
    config: AssemblerConfig,
}

impl ContextAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn assemble(
        &self,
        memory_context: &[ConversationTurn],
        fused: &FusedContext,
        query: &str,
    ) -> String {
        let max = self.config.max_chars;
        let history = self.format_history(memory_context);
        let query = query.trim();

        let mut items: &[FusedItem] = &fused.items;
        while !items.is_empty() {
            let prompt = join_sections(&history, &self.format_evidence(items), &question_section(query));
            if prompt.chars().count() <= max {
                return prompt;
            }
            // items are ordered best-first, so the tail is the lowest-scored
            items = &items[..items.len() - 1];
        }

        let prompt = join_sections(&history, "", &question_section(query));
        let total = prompt.chars().count();
        if total <= max {
            return prompt;
        }
        tracing::debug!(total, max, "Prompt over budget with no evidence left; truncating");

        let history_len = if history.is_empty() { 0 } else { history.chars().count() + 1 };
        let query_room = max.saturating_sub(question_section("").chars().count() + history_len);
        if query_room >= MIN_QUERY_CHARS {
            return join_sections(&history, "", &question_section(&truncate_chars(query, query_room)));
        }

        let question = question_section(&truncate_chars(query, MIN_QUERY_CHARS));
        let history_room = max.saturating_sub(question.chars().count() + 1);
        join_sections(&truncate_chars(&history, history_room), "", &question)
    }

    fn format_history(&self, turns: &[ConversationTurn]) -> String {
        if turns.is_empty() || self.config.max_history_chars == 0 {
            return String::new();
        }

        // split the budget evenly so no selected turn is dropped
        let per_turn = (self.config.max_history_chars / turns.len()).max(40);
        let mut out = String::from(HISTORY_HEADER);
        for (i, turn) in turns.iter().enumerate() {
            let half = per_turn / 2;
            out.push_str(&format!(
                "[{}] User: {}\n    Assistant: {}\n",
                i + 1,
                truncate_chars(turn.query.trim(), half),
                truncate_chars(turn.response.trim(), per_turn - half)
            ));
        }
        out
    }

    fn format_evidence(&self, items: &[FusedItem]) -> String {
        if items.is_empty() {
            return String::new();
        }

        let mut out = String::from(EVIDENCE_HEADER);
        for (i, item) in items.iter().enumerate() {
            let (kind, body) = match &item.evidence {
                Evidence::Local(chunk) => ("local", chunk.content.trim().to_string()),
                Evidence::Web(result) => ("web", result.text()),
            };
            out.push_str(&format!(
                "[{}] (Source: {} [{}], relevance: {:.2})\n{}\n\n",
                i + 1,
                item.evidence.source_label(),
                kind,
                item.composite_score,
                truncate_chars(&body, self.config.max_item_chars)
            ));
        }
        out
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(AssemblerConfig::default())
    }
}

fn question_section(query: &str) -> String {
    format!("{}{}\n", QUESTION_HEADER, query)
}

fn join_sections(history: &str, evidence: &str, question: &str) -> String {
    [history, evidence, question]
        .into_iter()
        .filter(|section| !section.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::types::{Chunk, WebResult};
    use std::collections::BTreeSet;

    fn item(id: &str, content: &str, score: f64) -> FusedItem {
        FusedItem {
            evidence: Evidence::Local(Chunk::new(id, content, format!("{}.md", id), 0.5)),
            composite_score: score,
        }
    }

    fn fused(items: Vec<FusedItem>) -> FusedContext {
        FusedContext {
            items,
            ..FusedContext::default()
        }
    }

    fn turn(query: &str, response: &str) -> ConversationTurn {
        ConversationTurn::new(query, response, BTreeSet::new(), BTreeSet::new())
    }

    #[test]
    fn sections_appear_in_order() {
        let assembler = ContextAssembler::default();
        let web = FusedItem {
            evidence: Evidence::Web(WebResult {
                title: "Present perfect".into(),
                snippet: "Used for experiences.".into(),
                url: "https://en.wikipedia.org/wiki/Present_perfect".into(),
                source_domain: "en.wikipedia.org".into(),
                credibility_score: 0.9,
            }),
            composite_score: 0.7,
        };
        let context = assembler.assemble(
            &[turn("what is a tense?", "A tense marks time.")],
            &fused(vec![item("a", "Have + past participle.", 0.9), web]),
            "present perfect examples",
        );

        let history = context.find("## Conversation history").unwrap();
        let evidence = context.find("## Reference material").unwrap();
        let question = context.find("## Question").unwrap();
        assert!(history < evidence && evidence < question);
        assert!(context.contains("(Source: a.md [local], relevance: 0.90)"));
        assert!(context.contains("(Source: en.wikipedia.org [web], relevance: 0.70)"));
        assert!(context.trim_end().ends_with("present perfect examples"));
    }

    #[test]
    fn empty_inputs_yield_only_the_question() {
        let context = ContextAssembler::default().assemble(&[], &FusedContext::default(), "hi");
        assert_eq!(context, "## Question\nhi\n");
    }

    #[test]
    fn over_budget_drops_lowest_scored_items_but_keeps_history() {
        let assembler = ContextAssembler::new(AssemblerConfig {
            max_chars: 700,
            max_history_chars: 200,
            max_item_chars: 200,
        });
        let items = vec![
            item("best", &"b".repeat(180), 0.9),
            item("middle", &"m".repeat(180), 0.6),
            item("worst", &"w".repeat(180), 0.1),
        ];
        let turns = vec![turn("earlier question", "earlier answer")];

        let context = assembler.assemble(&turns, &fused(items), "query");
        assert!(context.chars().count() <= 700);
        assert!(context.contains("earlier question"));
        assert!(context.contains("best.md"));
        assert!(!context.contains("worst.md"));
    }

    #[test]
    fn oversized_query_is_cut_to_the_budget() {
        let assembler = ContextAssembler::default();
        let max = assembler.config().max_chars;
        let query = "x ".repeat(5000);

        let context = assembler.assemble(&[], &fused(vec![item("a", "Have + past participle.", 0.9)]), &query);
        assert!(context.chars().count() <= max);
        assert!(context.starts_with("## Question\nx x"));
        assert!(context.trim_end().ends_with('…'));
        assert!(!context.contains("a.md"));
    }

    #[test]
    fn long_query_is_cut_before_history() {
        let assembler = ContextAssembler::new(AssemblerConfig {
            max_chars: 600,
            max_history_chars: 200,
            max_item_chars: 200,
        });
        let turns = vec![turn("earlier question", "earlier answer")];

        let context = assembler.assemble(&turns, &FusedContext::default(), &"why ".repeat(500));
        assert!(context.chars().count() <= 600);
        assert!(context.contains("earlier question"));
        assert!(context.contains("earlier answer"));
        assert!(context.trim_end().ends_with('…'));
    }

    #[test]
    fn history_gives_way_once_the_query_is_at_its_floor() {
        let assembler = ContextAssembler::new(AssemblerConfig {
            max_chars: 300,
            max_history_chars: 300,
            max_item_chars: 200,
        });
        let turns: Vec<ConversationTurn> = (0..5)
            .map(|i| turn(&format!("question {} {}", i, "q".repeat(100)), &"a".repeat(100)))
            .collect();

        let context = assembler.assemble(&turns, &FusedContext::default(), &"why ".repeat(500));
        assert_eq!(context.chars().count(), 300);
        assert!(context.starts_with("## Conversation history"));
        let question = context.find("## Question\n").unwrap();
        assert_eq!(context[question..].trim_end().chars().count(), "## Question\n".len() + MIN_QUERY_CHARS);
    }

    #[test]
    fn long_items_are_truncated() {
        let assembler = ContextAssembler::new(AssemblerConfig {
            max_item_chars: 10,
            ..AssemblerConfig::default()
        });
        let context = assembler.assemble(&[], &fused(vec![item("a", &"x".repeat(50), 0.5)]), "q");
        assert!(context.contains(&format!("{}…", "x".repeat(9))));
        assert!(!context.contains(&"x".repeat(10)));
    }
}

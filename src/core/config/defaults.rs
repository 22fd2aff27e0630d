use std::collections::BTreeMap;

/// Grammar terminology recognized by the keyword extractor.
pub fn grammar_terms() -> Vec<String> {
    [
        "present perfect",
        "past perfect",
        "past tense",
        "future tense",
        "present continuous",
        "passive voice",
        "reported speech",
        "relative clause",
        "subjunctive",
        "conditionals",
        "articles",
        "prepositions",
        "conjunctions",
        "verbs",
        "nouns",
        "adjectives",
        "adverbs",
        "pronouns",
        "tense",
        "aspect",
        "grammar",
        "syntax",
        "clause",
        "phrase",
        "sentence",
        "现在完成时",
        "过去时",
        "将来时",
        "虚拟语气",
        "冠词",
        "介词",
        "连词",
        "动词",
        "名词",
        "形容词",
        "副词",
        "代词",
        "时态",
        "语法",
        "从句",
        "短语",
        "句子",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Terms that mark a query as belonging to the learning domain.
pub fn trigger_terms() -> Vec<String> {
    [
        "grammar", "tense", "perfect", "continuous", "passive", "conditional", "clause",
        "usage", "article", "preposition", "英语", "语法", "用法", "时态", "冠词", "从句",
        "虚拟语气",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn stop_words() -> Vec<String> {
    [
        "the", "and", "for", "are", "but", "not", "you", "your", "all", "can", "her", "was",
        "one", "our", "out", "has", "have", "had", "him", "his", "how", "its", "may", "who",
        "did", "does", "get", "got", "let", "she", "too", "use", "what", "when", "where",
        "which", "why", "with", "this", "that", "these", "those", "from", "they", "them",
        "then", "than", "there", "their", "about", "would", "could", "should", "into",
        "some", "more", "most", "also", "just", "like", "please", "give", "tell", "explain",
        "is", "it", "of", "to", "in", "on", "a", "an", "me", "my", "i",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn credible_domains() -> BTreeMap<String, f64> {
    [
        ("wikipedia.org", 0.9),
        ("britannica.com", 0.9),
        ("cambridge.org", 0.95),
        ("oxfordlearnersdictionaries.com", 0.95),
        ("merriam-webster.com", 0.9),
        ("bbc.co.uk", 0.85),
        ("britishcouncil.org", 0.9),
        ("grammarly.com", 0.75),
        ("duckduckgo.com", 0.6),
    ]
    .iter()
    .map(|(domain, score)| (domain.to_string(), *score))
    .collect()
}

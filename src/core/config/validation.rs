use super::settings::EngineConfig;
use crate::core::errors::EngineError;

pub fn validate_config(config: &EngineConfig) -> Result<(), EngineError> {
    let retrieval = &config.retrieval;
    validate_usize_field("retrieval.k", retrieval.k, 1, 1_000)?;
    validate_usize_field(
        "retrieval.min_similarity_results",
        retrieval.min_similarity_results,
        0,
        1_000,
    )?;
    validate_unit_field("retrieval.mmr_lambda", retrieval.mmr_lambda)?;
    validate_usize_field("retrieval.mmr_fetch_k", retrieval.mmr_fetch_k, 1, 10_000)?;

    let scoring = &config.scoring;
    validate_f64_field("scoring.threshold", scoring.threshold, 0.0, 100.0)?;
    validate_usize_field("scoring.target_count", scoring.target_count, 1, 1_000)?;
    validate_weights(
        "scoring",
        &[
            ("coverage_weight", scoring.coverage_weight),
            ("semantic_weight", scoring.semantic_weight),
            ("diversity_weight", scoring.diversity_weight),
        ],
    )?;
    if !scoring.score_min.is_finite()
        || !scoring.score_max.is_finite()
        || scoring.score_max <= scoring.score_min
    {
        return Err(EngineError::config(format!(
            "Invalid config at 'scoring.score_max': must be greater than score_min ({} <= {})",
            scoring.score_max, scoring.score_min
        )));
    }

    let fusion = &config.fusion;
    if !(fusion.dedup_threshold > 0.0 && fusion.dedup_threshold <= 1.0) {
        return Err(EngineError::config(
            "Invalid config at 'fusion.dedup_threshold': must be in (0, 1]",
        ));
    }
    validate_usize_field("fusion.max_items", fusion.max_items, 1, 100)?;
    validate_weights(
        "fusion",
        &[
            ("content_length_weight", fusion.content_length_weight),
            ("credibility_weight", fusion.credibility_weight),
            ("relevance_weight", fusion.relevance_weight),
        ],
    )?;
    validate_usize_field(
        "fusion.content_length_target",
        fusion.content_length_target,
        1,
        1_000_000,
    )?;
    validate_usize_field("fusion.web_max_results", fusion.web_max_results, 1, 50)?;
    validate_unit_field(
        "fusion.credibility.default_score",
        fusion.credibility.default_score,
    )?;
    for (domain, score) in &fusion.credibility.domains {
        validate_unit_field(&format!("fusion.credibility.domains.{}", domain), *score)?;
    }
    validate_string_list("fusion.augmentation.trigger_terms", &fusion.augmentation.trigger_terms)?;

    let memory = &config.memory;
    validate_usize_field("memory.max_turns", memory.max_turns, 1, 100)?;
    validate_unit_field("memory.relevance_floor", memory.relevance_floor)?;
    validate_weights(
        "memory",
        &[
            ("keyword_weight", memory.keyword_weight),
            ("recency_weight", memory.recency_weight),
        ],
    )?;
    validate_string_list("memory.keywords.domain_terms", &memory.keywords.domain_terms)?;
    validate_usize_field(
        "memory.keywords.min_term_chars",
        memory.keywords.min_term_chars,
        1,
        64,
    )?;

    let assembler = &config.assembler;
    validate_usize_field("assembler.max_chars", assembler.max_chars, 200, 10_000_000)?;
    validate_usize_field(
        "assembler.max_history_chars",
        assembler.max_history_chars,
        0,
        assembler.max_chars,
    )?;
    validate_usize_field("assembler.max_item_chars", assembler.max_item_chars, 1, assembler.max_chars)?;

    let collaborators = &config.collaborators;
    validate_u64_field(
        "collaborators.index_timeout_ms",
        collaborators.index_timeout_ms,
        1,
        600_000,
    )?;
    validate_u64_field(
        "collaborators.web_timeout_ms",
        collaborators.web_timeout_ms,
        1,
        600_000,
    )?;
    validate_u64_field(
        "collaborators.llm_timeout_secs",
        collaborators.llm_timeout_secs,
        1,
        86_400,
    )?;
    for (index, engine) in collaborators.web_engines.iter().enumerate() {
        if !matches!(engine.as_str(), "duckduckgo" | "wikipedia") {
            return Err(EngineError::config(format!(
                "Invalid config at 'collaborators.web_engines[{}]': unknown engine '{}'",
                index, engine
            )));
        }
    }

    Ok(())
}

fn validate_usize_field(path: &str, value: usize, min: usize, max: usize) -> Result<(), EngineError> {
    if value < min || value > max {
        return Err(range_error(path, min, max));
    }
    Ok(())
}

fn validate_u64_field(path: &str, value: u64, min: u64, max: u64) -> Result<(), EngineError> {
    if value < min || value > max {
        return Err(range_error(path, min, max));
    }
    Ok(())
}

fn validate_f64_field(path: &str, value: f64, min: f64, max: f64) -> Result<(), EngineError> {
    if !value.is_finite() || value < min || value > max {
        return Err(range_error(path, min, max));
    }
    Ok(())
}

fn validate_unit_field(path: &str, value: f64) -> Result<(), EngineError> {
    validate_f64_field(path, value, 0.0, 1.0)
}

/// Weights must be non-negative and must not all be zero.
fn validate_weights(section: &str, weights: &[(&str, f64)]) -> Result<(), EngineError> {
    for (key, weight) in weights {
        if !weight.is_finite() || *weight < 0.0 {
            return Err(EngineError::config(format!(
                "Invalid config at '{}.{}': must be a non-negative number",
                section, key
            )));
        }
    }
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return Err(EngineError::config(format!(
            "Invalid config at '{}': weights must not all be zero",
            section
        )));
    }
    Ok(())
}

fn validate_string_list(path: &str, items: &[String]) -> Result<(), EngineError> {
    for (index, item) in items.iter().enumerate() {
        if item.trim().is_empty() {
            return Err(EngineError::config(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn range_error<T: std::fmt::Display>(path: &str, min: T, max: T) -> EngineError {
    EngineError::config(format!(
        "Invalid config at '{}': must be between {} and {}",
        path, min, max
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn rejects_inverted_score_range() {
        let mut config = EngineConfig::default();
        config.scoring.score_min = 1.0;
        config.scoring.score_max = 0.5;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("scoring.score_max"));
    }

    #[test]
    fn rejects_all_zero_weights() {
        let mut config = EngineConfig::default();
        config.fusion.content_length_weight = 0.0;
        config.fusion.credibility_weight = 0.0;
        config.fusion.relevance_weight = 0.0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("'fusion'"));
    }

    #[test]
    fn rejects_unknown_web_engine() {
        let mut config = EngineConfig::default();
        config.collaborators.web_engines.push("altavista".to_string());
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("web_engines[2]"));
    }

    #[test]
    fn rejects_zero_dedup_threshold() {
        let mut config = EngineConfig::default();
        config.fusion.dedup_threshold = 0.0;
        assert!(validate_config(&config).is_err());
    }
}

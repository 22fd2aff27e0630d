use crate::core::errors::EngineError;

pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, EngineError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(EngineError::MalformedScoreInput(
            "Vectors must not be empty".to_string(),
        ));
    }
    if query.len() != candidate.len() {
        return Err(EngineError::MalformedScoreInput(format!(
            "Vector length mismatch: {} != {}",
            query.len(),
            candidate.len()
        )));
    }

    let dot: f32 = query.iter().zip(candidate).map(|(a, b)| a * b).sum();
    let denom = l2_norm(query) * l2_norm(candidate);
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }

    Ok((dot / denom).clamp(-1.0, 1.0))
}

/// Cosine similarity that treats unusable vectors as unrelated.
pub fn cosine_or_zero(query: &[f32], candidate: &[f32]) -> f32 {
    cosine_similarity(query, candidate).unwrap_or(0.0)
}

/// Maximal Marginal Relevance selection.
///
/// Greedily picks up to `k` candidates maximizing
/// `λ * sim(query, d) - (1 - λ) * max(sim(d, selected))`.
/// Returns indices into `candidates` in selection order.
pub fn mmr_select(query: &[f32], candidates: &[Vec<f32>], k: usize, lambda: f64) -> Vec<usize> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }

    let relevance: Vec<f64> = candidates
        .iter()
        .map(|c| cosine_or_zero(query, c) as f64)
        .collect();

    let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();

    while selected.len() < k && !remaining.is_empty() {
        let mut best: Option<(usize, f64)> = None;
        for (pos, &idx) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|&s| cosine_or_zero(&candidates[idx], &candidates[s]) as f64)
                .fold(0.0_f64, f64::max);
            let score = lambda * relevance[idx] - (1.0 - lambda) * redundancy;
            // strict comparison keeps the earlier (higher-ranked) candidate on ties
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((pos, score));
            }
        }

        let Some((pos, _)) = best else { break };
        selected.push(remaining.remove(pos));
    }

    selected
}

fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

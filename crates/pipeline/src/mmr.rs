//! Maximal Marginal Relevance selection.
//!
//! Greedy diversity-aware selection over retrieval candidates. Each round
//! picks the candidate maximizing `λ·relevance − (1−λ)·max_similarity` to
//! the already-selected set, trading raw relevance against redundancy.

use crate::types::Candidate;
use minirag_clients::cosine_similarity;

/// Select up to `k` candidates by Maximal Marginal Relevance.
///
/// `lambda` = 1.0 reduces to pure relevance ranking; 0.0 to pure
/// diversity. Relevance is the candidate's retrieval score; similarity is
/// cosine over the candidates' embeddings. Ties break toward the higher
/// relevance score, then the earlier original index, so the output is
/// deterministic for a fixed input ordering.
pub fn select(candidates: &[Candidate], k: usize, lambda: f32) -> Vec<Candidate> {
    if k == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();

    while selected.len() < k && !remaining.is_empty() {
        let mut best_slot = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        let mut best_relevance = f32::NEG_INFINITY;

        for (slot, &idx) in remaining.iter().enumerate() {
            let candidate = &candidates[idx];
            let max_similarity = selected
                .iter()
                .map(|&s| cosine_similarity(&candidate.embedding, &candidates[s].embedding))
                .fold(f32::NEG_INFINITY, f32::max);

            // First pick has no diversity term
            let diversity = if selected.is_empty() {
                0.0
            } else {
                max_similarity
            };
            let score = lambda * candidate.score - (1.0 - lambda) * diversity;

            // Strict comparisons preserve original-index order on full ties
            if score > best_score
                || (score == best_score && candidate.score > best_relevance)
            {
                best_slot = slot;
                best_score = score;
                best_relevance = candidate.score;
            }
        }

        selected.push(remaining.remove(best_slot));
    }

    selected.into_iter().map(|i| candidates[i].clone()).collect()
}

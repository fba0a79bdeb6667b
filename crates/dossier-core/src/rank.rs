//! Similarity ranking over stored embedding records.
//!
//! The ranker is a full linear scan: every candidate is scored against the
//! query vector with cosine similarity and the top `limit` survive. There
//! is no index structure — corpora are small, owner-partitioned document
//! sets, and [`rank`] is the stable contract behind which an index could
//! be substituted later.
//!
//! A malformed candidate (wrong vector length, zero magnitude, non-finite
//! entries) scores exactly `0.0` and never aborts the scan.

use crate::models::{EmbeddingRecord, RankedCandidate};

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, a
/// zero-magnitude vector on either side, or non-finite input entries —
/// degenerate inputs are scored, not propagated.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    let sim = dot / denom;
    if sim.is_finite() {
        sim
    } else {
        0.0
    }
}

/// Score every candidate against `query` and return the top `limit`.
///
/// Ordering is strictly descending by score; candidates with equal scores
/// keep their original input order (the sort is stable). `limit` is
/// clamped to `[1, candidates.len()]`, so asking for more than available
/// returns everything and asking for zero returns one.
pub fn rank(
    query: &[f32],
    candidates: &[EmbeddingRecord],
    limit: usize,
) -> Vec<RankedCandidate> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let limit = limit.clamp(1, candidates.len());

    let mut scored: Vec<RankedCandidate> = candidates
        .iter()
        .map(|rec| RankedCandidate {
            document_id: rec.document_id.clone(),
            text: rec.text.clone(),
            score: cosine_similarity(query, &rec.vector),
        })
        .collect();

    // Stable sort: equal scores preserve input order.
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(doc_id: &str, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            owner_id: "owner-1".to_string(),
            document_id: doc_id.to_string(),
            vector,
            text: format!("text for {}", doc_id),
        }
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_symmetric() {
        let a = vec![0.3, -1.2, 4.5];
        let b = vec![2.0, 0.5, -0.7];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_different_lengths() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_zero_magnitude() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&b, &a), 0.0);
    }

    #[test]
    fn test_cosine_non_finite_entries() {
        let a = vec![f32::NAN, 1.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);

        let c = vec![f32::INFINITY, 1.0];
        assert_eq!(cosine_similarity(&c, &b), 0.0);
    }

    #[test]
    fn test_rank_output_length() {
        let candidates = vec![
            record("d1", vec![1.0, 0.0]),
            record("d2", vec![0.0, 1.0]),
            record("d3", vec![1.0, 1.0]),
        ];
        assert_eq!(rank(&[1.0, 0.0], &candidates, 2).len(), 2);
        assert_eq!(rank(&[1.0, 0.0], &candidates, 10).len(), 3);
        // Zero is clamped up to one result.
        assert_eq!(rank(&[1.0, 0.0], &candidates, 0).len(), 1);
    }

    #[test]
    fn test_rank_descending_order() {
        let candidates = vec![
            record("low", vec![0.0, 1.0]),
            record("high", vec![1.0, 0.0]),
            record("mid", vec![1.0, 1.0]),
        ];
        let ranked = rank(&[1.0, 0.0], &candidates, 3);
        let ids: Vec<&str> = ranked.iter().map(|c| c.document_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        // Scores against [1, 0]: 0.9..., 0.1..., 0.9..., 0.5..., 0.0 — built so
        // candidates 0 and 2 tie exactly and input order decides between them.
        let tied = vec![9.0, 4.358898]; // cos ≈ 0.9
        let candidates = vec![
            record("c0", tied.clone()),
            record("c1", vec![1.0, 9.949874]), // cos ≈ 0.1
            record("c2", tied),
            record("c3", vec![1.0, 1.7320508]), // cos = 0.5
            record("c4", vec![0.0, 1.0]),       // cos = 0.0
        ];
        let ranked = rank(&[1.0, 0.0], &candidates, 3);
        let ids: Vec<&str> = ranked.iter().map(|c| c.document_id.as_str()).collect();
        assert_eq!(ids, vec!["c0", "c2", "c3"]);
    }

    #[test]
    fn test_rank_malformed_candidate_does_not_abort() {
        let candidates = vec![
            record("good", vec![1.0, 0.0]),
            record("short", vec![1.0]),
            record("nan", vec![f32::NAN, 0.5]),
            record("zero", vec![0.0, 0.0]),
        ];
        let ranked = rank(&[1.0, 0.0], &candidates, 4);
        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[0].document_id, "good");
        for c in &ranked[1..] {
            assert_eq!(c.score, 0.0);
        }
    }

    #[test]
    fn test_rank_empty_candidates() {
        assert!(rank(&[1.0, 0.0], &[], 5).is_empty());
    }
}

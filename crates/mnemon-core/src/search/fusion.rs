//! Score fusion strategies for combining the keyword and vector rankings.
//!
//! All three strategies are pure functions of their inputs: no hidden
//! state, fully deterministic, testable independently of any live
//! retrieval.
//!
//! - [`reciprocal_rank_fusion`] (default): rank-position based. Robust to
//!   the two scoring scales (BM25's unbounded scale vs. vector
//!   similarity's [0,1] scale) without any tuning.
//! - [`weighted_fusion`]: blends the vector score with a capped-normalized
//!   BM25 score.
//! - [`max_fusion`]: conservative; never penalizes a document strong in
//!   only one retrieval path.

use crate::config::KEYWORD_NORM_CAP;
use std::collections::HashMap;
use std::hash::Hash;

/// Combines two ranked lists using Reciprocal Rank Fusion.
///
/// Each document receives a contribution `1/(k + rank)` from every list
/// it appears in, where `rank` is its 0-based position in that list, and
/// zero contribution from lists it is absent from. Contributions are
/// summed per document.
///
/// Reference: "Reciprocal Rank Fusion outperforms Condorcet and individual
/// Rank Learning Methods" by Cormack, Clarke, and Buettcher (SIGIR 2009).
pub fn reciprocal_rank_fusion<T: Clone + Eq + Hash>(
    ranking_a: &[T],
    ranking_b: &[T],
    k: usize,
) -> HashMap<T, f32> {
    let k_param = k as f32;
    let mut scores: HashMap<T, f32> = HashMap::new();

    for (rank, item) in ranking_a.iter().enumerate() {
        *scores.entry(item.clone()).or_insert(0.0) += 1.0 / (k_param + rank as f32);
    }
    for (rank, item) in ranking_b.iter().enumerate() {
        *scores.entry(item.clone()).or_insert(0.0) += 1.0 / (k_param + rank as f32);
    }

    scores
}

/// Squashes an unbounded BM25 score into [0, 1] via a fixed cap:
/// `min(score / 10, 1)`.
///
/// The cap is a documented heuristic, not an adaptive normalization, a
/// tunable preserved for behavioral parity, shared by the weighted and max
/// strategies.
pub fn normalize_keyword_score(keyword_score: f32) -> f32 {
    (keyword_score / KEYWORD_NORM_CAP).min(1.0)
}

/// Weighted blend: `vector_score·wv + min(keyword_score/10, 1)·wk`.
///
/// `wv + wk` is expected to equal 1; this is not enforced, callers should
/// normalize their weights.
pub fn weighted_fusion(vector_score: f32, keyword_score: f32, wv: f32, wk: f32) -> f32 {
    vector_score * wv + normalize_keyword_score(keyword_score) * wk
}

/// Max of the vector score and the capped-normalized keyword score.
pub fn max_fusion(vector_score: f32, keyword_score: f32) -> f32 {
    vector_score.max(normalize_keyword_score(keyword_score))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rrf_literal_contributions() {
        // Vector ranking [A, B, C], keyword ranking [B, A, D], k=60.
        let vector = ["A", "B", "C"];
        let keyword = ["B", "A", "D"];
        let fused = reciprocal_rank_fusion(&vector, &keyword, 60);

        let expected_a = 1.0 / 60.0 + 1.0 / 61.0;
        let expected_b = 1.0 / 61.0 + 1.0 / 60.0;
        let expected_single = 1.0 / 62.0;

        assert!((fused["A"] - expected_a).abs() < 1e-6);
        assert!((fused["B"] - expected_b).abs() < 1e-6);
        assert!((fused["A"] - fused["B"]).abs() < 1e-6, "A and B are tied");
        assert!((fused["C"] - expected_single).abs() < 1e-6);
        assert!((fused["D"] - expected_single).abs() < 1e-6);
        assert!(fused["A"] > fused["C"]);
    }

    #[test]
    fn test_rrf_both_lists_beats_single_list_at_equal_rank() {
        // A document in both top-K lists always scores at least as high as
        // one in a single list at equal or better individual rank.
        for k in [1usize, 10, 60, 200] {
            let vector = ["both", "v_only"];
            let keyword = ["both", "k_only"];
            let fused = reciprocal_rank_fusion(&vector, &keyword, k);
            assert!(fused["both"] >= fused["v_only"]);
            assert!(fused["both"] >= fused["k_only"]);
        }
    }

    #[test]
    fn test_rrf_is_pure() {
        let vector = ["x", "y"];
        let keyword = ["y", "z"];
        let first = reciprocal_rank_fusion(&vector, &keyword, 60);
        let second = reciprocal_rank_fusion(&vector, &keyword, 60);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rrf_empty_inputs() {
        let empty: [&str; 0] = [];
        let keyword = ["a", "b"];
        let fused = reciprocal_rank_fusion(&empty, &keyword, 60);
        assert_eq!(fused.len(), 2);
        assert!(fused["a"] > fused["b"]);

        let both_empty = reciprocal_rank_fusion::<&str>(&empty, &empty, 60);
        assert!(both_empty.is_empty());
    }

    #[test]
    fn test_weighted_fusion_literal_example() {
        // vector=0.85, keyword=6.5, wv=0.6, wk=0.4
        // normalized keyword = 0.65, fused = 0.85·0.6 + 0.65·0.4 = 0.77
        let fused = weighted_fusion(0.85, 6.5, 0.6, 0.4);
        assert!((fused - 0.77).abs() < 1e-6);
    }

    #[test]
    fn test_keyword_normalization_caps_at_one() {
        assert!((normalize_keyword_score(5.0) - 0.5).abs() < 1e-6);
        assert_eq!(normalize_keyword_score(10.0), 1.0);
        assert_eq!(normalize_keyword_score(250.0), 1.0);
        assert_eq!(normalize_keyword_score(0.0), 0.0);
    }

    #[test]
    fn test_max_fusion_takes_stronger_path() {
        // Strong keyword, weak vector.
        assert!((max_fusion(0.1, 9.0) - 0.9).abs() < 1e-6);
        // Strong vector, weak keyword.
        assert!((max_fusion(0.8, 1.0) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_strategies_are_deterministic() {
        for _ in 0..3 {
            assert_eq!(weighted_fusion(0.4, 3.0, 0.5, 0.5), weighted_fusion(0.4, 3.0, 0.5, 0.5));
            assert_eq!(max_fusion(0.4, 3.0), max_fusion(0.4, 3.0));
        }
    }
}

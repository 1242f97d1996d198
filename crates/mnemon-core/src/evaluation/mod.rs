//! Retrieval-quality measurement.
//!
//! Standard Information Retrieval metrics over ranked result lists with
//! ground-truth relevance judgments:
//!
//! | Metric | Description |
//! |--------|-------------|
//! | NDCG@k | Normalized Discounted Cumulative Gain, graded and position-aware |
//! | MRR | Mean Reciprocal Rank, position of the first relevant result |
//! | P@k | Fraction of the top k that are relevant |
//! | R@k | Fraction of the relevant set found in the top k |
//!
//! Per-query metrics live in [`metrics`]; [`evaluate`] averages them over
//! a labeled query batch.

pub mod metrics;

pub use metrics::{
    average_precision, ndcg_at_k, precision_at_k, recall_at_k, reciprocal_rank, QueryMetrics,
    RelevanceJudgment,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A labeled evaluation query: the query text, the ranked result ids the
/// system returned (best first, with scores), and the ground truth.
#[derive(Debug, Clone)]
pub struct LabeledQuery {
    /// Query text, carried for reporting
    pub query: String,
    /// Ranked `(document_id, score)` results, highest score first
    pub results: Vec<(String, f32)>,
    /// Ground-truth relevance judgments for this query
    pub judgments: Vec<RelevanceJudgment>,
}

/// Metrics averaged over a query batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalReport {
    /// Number of queries evaluated
    pub query_count: usize,
    /// Mean Precision@k
    pub precision_at_k: f64,
    /// Mean Recall@k
    pub recall_at_k: f64,
    /// Mean Reciprocal Rank
    pub mrr: f64,
    /// Mean NDCG@k
    pub ndcg: f64,
    /// Cutoff used for the @k metrics
    pub k: usize,
}

/// Averages per-query metrics over a labeled batch at cutoff `k`.
///
/// An empty batch yields a zeroed report rather than NaN averages.
pub fn evaluate(queries: &[LabeledQuery], k: usize) -> EvalReport {
    if queries.is_empty() {
        return EvalReport {
            k,
            ..EvalReport::default()
        };
    }

    let mut precision_sum = 0.0;
    let mut recall_sum = 0.0;
    let mut mrr_sum = 0.0;
    let mut ndcg_sum = 0.0;

    for labeled in queries {
        precision_sum += precision_at_k(&labeled.results, &labeled.judgments, k);
        recall_sum += recall_at_k(&labeled.results, &labeled.judgments, k);
        mrr_sum += reciprocal_rank(&labeled.results, &labeled.judgments);
        ndcg_sum += ndcg_at_k(&labeled.results, &labeled.judgments, k);
    }

    let n = queries.len() as f64;
    let report = EvalReport {
        query_count: queries.len(),
        precision_at_k: precision_sum / n,
        recall_at_k: recall_sum / n,
        mrr: mrr_sum / n,
        ndcg: ndcg_sum / n,
        k,
    };
    debug!(queries = report.query_count, k, "Evaluated query batch");
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judged(id: &str) -> RelevanceJudgment {
        RelevanceJudgment::relevant(id.to_string())
    }

    #[test]
    fn test_evaluate_averages_over_queries() {
        let perfect = LabeledQuery {
            query: "first".to_string(),
            results: vec![("a".to_string(), 0.9)],
            judgments: vec![judged("a")],
        };
        let miss = LabeledQuery {
            query: "second".to_string(),
            results: vec![("b".to_string(), 0.9)],
            judgments: vec![judged("c")],
        };

        let report = evaluate(&[perfect, miss], 5);
        assert_eq!(report.query_count, 2);
        assert!((report.mrr - 0.5).abs() < 1e-9);
        assert!((report.recall_at_k - 0.5).abs() < 1e-9);
        assert!((report.ndcg - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_batch_is_zeroed_not_nan() {
        let report = evaluate(&[], 10);
        assert_eq!(report.query_count, 0);
        assert_eq!(report.mrr, 0.0);
        assert_eq!(report.ndcg, 0.0);
        assert_eq!(report.k, 10);
    }
}

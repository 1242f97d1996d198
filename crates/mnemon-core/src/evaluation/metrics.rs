//! Per-query Information Retrieval metrics.
//!
//! References:
//! - Järvelin & Kekäläinen (2002), "Cumulated gain-based evaluation of IR
//!   techniques"
//! - Voorhees & Harman (2005), "TREC: Experiment and Evaluation in
//!   Information Retrieval"

use std::collections::{HashMap, HashSet};

/// Graded relevance judgment for a document.
///
/// Grades: 0 = not relevant, 1 = somewhat relevant, 2 = highly relevant.
/// Binary ground truth (0/1) works with every metric here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevanceJudgment {
    /// The document id being judged
    pub document_id: String,
    /// Relevance grade
    pub relevance: u8,
}

impl RelevanceJudgment {
    /// Creates a judgment with an explicit grade.
    pub fn new(document_id: impl Into<String>, relevance: u8) -> Self {
        Self {
            document_id: document_id.into(),
            relevance,
        }
    }

    /// Binary relevant (grade 1).
    pub fn relevant(document_id: impl Into<String>) -> Self {
        Self::new(document_id, 1)
    }

    /// Highly relevant (grade 2).
    pub fn highly_relevant(document_id: impl Into<String>) -> Self {
        Self::new(document_id, 2)
    }

    /// Any relevance above zero counts as relevant for the binary metrics.
    pub fn is_relevant(&self) -> bool {
        self.relevance > 0
    }
}

/// All per-query metrics at a single cutoff.
#[derive(Debug, Clone, Default)]
pub struct QueryMetrics {
    /// NDCG@k
    pub ndcg: f64,
    /// Average Precision
    pub average_precision: f64,
    /// Reciprocal Rank
    pub reciprocal_rank: f64,
    /// Precision@k
    pub precision: f64,
    /// Recall@k
    pub recall: f64,
}

impl QueryMetrics {
    /// Computes every metric for one query's ranked results at cutoff `k`.
    pub fn compute(results: &[(String, f32)], judgments: &[RelevanceJudgment], k: usize) -> Self {
        Self {
            ndcg: ndcg_at_k(results, judgments, k),
            average_precision: average_precision(results, judgments),
            reciprocal_rank: reciprocal_rank(results, judgments),
            precision: precision_at_k(results, judgments, k),
            recall: recall_at_k(results, judgments, k),
        }
    }
}

fn relevant_set(judgments: &[RelevanceJudgment]) -> HashSet<&str> {
    judgments
        .iter()
        .filter(|j| j.is_relevant())
        .map(|j| j.document_id.as_str())
        .collect()
}

/// NDCG@k with exponential gain `2^rel − 1` and log2 position discount.
///
/// ```text
/// DCG@k  = Σ_{i=1..k} (2^rel_i − 1) / log₂(i + 1)
/// NDCG@k = DCG@k / IDCG@k
/// ```
///
/// Returns 1.0 when the judgment set holds no relevant documents (an
/// empty ideal ranking cannot be improved on).
pub fn ndcg_at_k(results: &[(String, f32)], judgments: &[RelevanceJudgment], k: usize) -> f64 {
    let grades: HashMap<&str, u8> = judgments
        .iter()
        .map(|j| (j.document_id.as_str(), j.relevance))
        .collect();

    let dcg: f64 = results
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, (id, _))| {
            let rel = *grades.get(id.as_str()).unwrap_or(&0);
            gain(rel) / discount(i + 1)
        })
        .sum();

    let mut ideal: Vec<u8> = judgments.iter().map(|j| j.relevance).collect();
    ideal.sort_by(|a, b| b.cmp(a));
    let idcg: f64 = ideal
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, &rel)| gain(rel) / discount(i + 1))
        .sum();

    if idcg == 0.0 {
        1.0
    } else {
        dcg / idcg
    }
}

/// Exponential gain: rel=0 → 0, rel=1 → 1, rel=2 → 3.
#[inline]
fn gain(relevance: u8) -> f64 {
    (1u32 << relevance) as f64 - 1.0
}

/// Logarithmic discount for a 1-indexed position.
#[inline]
fn discount(position: usize) -> f64 {
    (position as f64 + 1.0).log2()
}

/// Average Precision: mean of the precision values at each relevant
/// result position. Returns 0.0 when no relevant documents exist.
pub fn average_precision(results: &[(String, f32)], judgments: &[RelevanceJudgment]) -> f64 {
    let relevant = relevant_set(judgments);
    if relevant.is_empty() {
        return 0.0;
    }

    let mut precision_sum = 0.0;
    let mut found = 0usize;
    for (i, (id, _)) in results.iter().enumerate() {
        if relevant.contains(id.as_str()) {
            found += 1;
            precision_sum += found as f64 / (i + 1) as f64;
        }
    }

    precision_sum / relevant.len() as f64
}

/// Reciprocal Rank: `1 / position` of the first relevant result, 0.0 when
/// none appears.
pub fn reciprocal_rank(results: &[(String, f32)], judgments: &[RelevanceJudgment]) -> f64 {
    let relevant = relevant_set(judgments);
    for (i, (id, _)) in results.iter().enumerate() {
        if relevant.contains(id.as_str()) {
            return 1.0 / (i + 1) as f64;
        }
    }
    0.0
}

/// Precision@k: fraction of the top k results that are relevant.
pub fn precision_at_k(results: &[(String, f32)], judgments: &[RelevanceJudgment], k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let relevant = relevant_set(judgments);
    let hits = results
        .iter()
        .take(k)
        .filter(|(id, _)| relevant.contains(id.as_str()))
        .count();
    hits as f64 / k as f64
}

/// Recall@k: fraction of the relevant set found in the top k. Returns 0.0
/// when no relevant documents exist.
pub fn recall_at_k(results: &[(String, f32)], judgments: &[RelevanceJudgment], k: usize) -> f64 {
    let relevant = relevant_set(judgments);
    if relevant.is_empty() {
        return 0.0;
    }
    let hits = results
        .iter()
        .take(k)
        .filter(|(id, _)| relevant.contains(id.as_str()))
        .count();
    hits as f64 / relevant.len() as f64
}

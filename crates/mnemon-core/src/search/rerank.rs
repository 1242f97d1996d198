//! Post-fusion reranking: relevance floor, diversity filtering, recency
//! boosting, and query-specific structural boosts.
//!
//! The reranker refines the fused-and-sorted candidate list in a fixed
//! order: filter, de-duplicate, boost, re-sort. All transforms are
//! synchronous and deterministic; "now" is injected at construction so
//! recency behavior is reproducible under test.

use super::text::jaccard_similarity;
use super::types::RetrievalCandidate;
use crate::config::{
    CODE_BLOCK_BOOST, DIVERSITY_THRESHOLD, HEADING_BOOST, PHRASE_MATCH_BOOST,
    RECENCY_BOOST_MONTH, RECENCY_BOOST_QUARTER, RECENCY_BOOST_WEEK, RECENCY_PENALTY_OLD,
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Reranker configuration.
#[derive(Debug, Clone)]
pub struct RerankConfig {
    /// Minimum fused score a candidate must reach to survive (default 0.0,
    /// permissive)
    pub min_score: f32,
    /// Jaccard similarity above which a candidate is suppressed as a
    /// near-duplicate of a higher-ranked kept candidate
    pub diversity_threshold: f32,
    /// Reference time for recency tiers
    pub now: DateTime<Utc>,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            min_score: 0.0,
            diversity_threshold: DIVERSITY_THRESHOLD,
            now: Utc::now(),
        }
    }
}

/// Applies relevance filtering, diversity suppression, recency and
/// query-specific boosts to a fused candidate list.
pub struct Reranker {
    config: RerankConfig,
}

impl Reranker {
    /// Creates a reranker with the given configuration.
    pub fn new(config: RerankConfig) -> Self {
        Self { config }
    }

    /// Reranks a fused-and-sorted candidate list.
    ///
    /// Applies, in order:
    /// 1. Relevance filter (drop below `min_score`)
    /// 2. Greedy diversity filter (suppress near-duplicates of kept items)
    /// 3. Recency boost tiers relative to the configured "now"
    /// 4. Query boosts: exact phrase ×1.3, markdown heading ×1.15, fenced
    ///    code block ×1.1 (multiplicative, stacking)
    ///
    /// then re-sorts by the adjusted score. The sort is stable, so
    /// candidates with equal adjusted scores keep their incoming order.
    pub fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievalCandidate>,
    ) -> Vec<RetrievalCandidate> {
        let incoming = candidates.len();

        let relevant: Vec<RetrievalCandidate> = candidates
            .into_iter()
            .filter(|c| c.fused_score >= self.config.min_score)
            .collect();

        let mut kept = diversity_filter(relevant, self.config.diversity_threshold);

        let query_lower = query.to_lowercase();
        for candidate in &mut kept {
            let mut score = candidate.fused_score;
            score *= recency_multiplier(self.config.now, candidate.date);

            if !query_lower.is_empty() && candidate.text.to_lowercase().contains(&query_lower) {
                score *= PHRASE_MATCH_BOOST;
            }
            if has_markdown_heading(&candidate.text) {
                score *= HEADING_BOOST;
            }
            if candidate.text.contains("```") {
                score *= CODE_BLOCK_BOOST;
            }

            candidate.fused_score = score;
        }

        kept.sort_by(|a, b| {
            b.fused_score
                .partial_cmp(&a.fused_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(incoming, kept = kept.len(), "Reranked candidates");
        kept
    }
}

/// Greedy single-pass diversity filter.
///
/// Walks the list in rank order and suppresses any candidate whose text
/// Jaccard similarity to an already-kept candidate exceeds `threshold`.
/// Order among kept items is preserved, and an already-diverse list is a
/// fixed point: running the filter on its own output changes nothing.
pub fn diversity_filter(
    candidates: Vec<RetrievalCandidate>,
    threshold: f32,
) -> Vec<RetrievalCandidate> {
    let mut kept: Vec<RetrievalCandidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let duplicate = kept
            .iter()
            .any(|k| jaccard_similarity(&k.text, &candidate.text) > threshold);
        if !duplicate {
            kept.push(candidate);
        }
    }

    kept
}

/// Tiered recency multiplier. Boundaries are inclusive of the more recent
/// tier: exactly 7 days old still earns the week boost.
fn recency_multiplier(now: DateTime<Utc>, date: DateTime<Utc>) -> f32 {
    let age_days = (now - date).num_days();
    if age_days <= 7 {
        RECENCY_BOOST_WEEK
    } else if age_days <= 30 {
        RECENCY_BOOST_MONTH
    } else if age_days <= 90 {
        RECENCY_BOOST_QUARTER
    } else {
        RECENCY_PENALTY_OLD
    }
}

fn has_markdown_heading(text: &str) -> bool {
    text.lines().any(|line| line.trim_start().starts_with('#'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn candidate(id: &str, text: &str, fused_score: f32, age_days: i64) -> RetrievalCandidate {
        RetrievalCandidate {
            id: id.to_string(),
            text: text.to_string(),
            source: format!("{id}.md"),
            source_type: "long_term".to_string(),
            date: fixed_now() - Duration::days(age_days),
            chunk_index: 0,
            vector_score: 0.0,
            keyword_score: 0.0,
            fused_score,
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn reranker(min_score: f32) -> Reranker {
        Reranker::new(RerankConfig {
            min_score,
            diversity_threshold: DIVERSITY_THRESHOLD,
            now: fixed_now(),
        })
    }

    #[test]
    fn test_relevance_filter_drops_low_scores() {
        let candidates = vec![
            candidate("keep", "interesting findings on consensus", 0.5, 50),
            candidate("drop", "barely related noise", 0.01, 50),
        ];
        let results = reranker(0.1).rerank("unmatched query", candidates);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "keep");
    }

    #[test]
    fn test_diversity_filter_suppresses_near_duplicates() {
        let candidates = vec![
            candidate("a", "the quick brown fox jumps over the lazy dog", 0.9, 50),
            candidate("b", "the quick brown fox jumps over a lazy dog", 0.8, 50),
            candidate("c", "completely unrelated discussion of databases", 0.7, 50),
        ];
        let kept = diversity_filter(candidates, DIVERSITY_THRESHOLD);
        let ids: Vec<&str> = kept.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_diversity_filter_is_idempotent() {
        let candidates = vec![
            candidate("a", "alpha beta gamma delta epsilon", 0.9, 50),
            candidate("b", "alpha beta gamma delta zeta", 0.8, 50),
            candidate("c", "totally different subject matter entirely", 0.7, 50),
            candidate("d", "one more distinct topic about storage engines", 0.6, 50),
        ];
        let once = diversity_filter(candidates, DIVERSITY_THRESHOLD);
        let twice = diversity_filter(once.clone(), DIVERSITY_THRESHOLD);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_recency_tiers() {
        let now = fixed_now();
        assert_eq!(recency_multiplier(now, now - Duration::days(3)), 1.2);
        // Boundary days belong to the more recent tier.
        assert_eq!(recency_multiplier(now, now - Duration::days(7)), 1.2);
        assert_eq!(recency_multiplier(now, now - Duration::days(8)), 1.1);
        assert_eq!(recency_multiplier(now, now - Duration::days(30)), 1.1);
        assert_eq!(recency_multiplier(now, now - Duration::days(31)), 1.0);
        assert_eq!(recency_multiplier(now, now - Duration::days(90)), 1.0);
        assert_eq!(recency_multiplier(now, now - Duration::days(91)), 0.9);
        assert_eq!(recency_multiplier(now, now - Duration::days(400)), 0.9);
    }

    #[test]
    fn test_phrase_match_boost() {
        let candidates = vec![candidate("a", "Notes about error handling in Rust", 1.0, 50)];
        let results = reranker(0.0).rerank("error handling", candidates);
        // 1.0 × 1.0 (recency neutral at 50 days) × 1.3 (phrase)
        assert!((results[0].fused_score - 1.3).abs() < 1e-6);
    }

    #[test]
    fn test_structural_boosts_stack() {
        let text = "# Heading\nSome prose.\n```rust\nfn main() {}\n```";
        let candidates = vec![candidate("a", text, 1.0, 50)];
        let results = reranker(0.0).rerank("no match here", candidates);
        // 1.0 × 1.15 (heading) × 1.1 (code block), recency neutral
        assert!((results[0].fused_score - 1.265).abs() < 1e-4);
    }

    #[test]
    fn test_boosts_reorder_results() {
        let candidates = vec![
            candidate("stale", "old notes about deployment strategy", 1.0, 400),
            candidate("fresh", "new notes about testing philosophy", 0.95, 2),
        ];
        let results = reranker(0.0).rerank("unrelated", candidates);
        // 0.95 × 1.2 = 1.14 beats 1.0 × 0.9 = 0.9.
        assert_eq!(results[0].id, "fresh");
        assert_eq!(results[1].id, "stale");
    }

    #[test]
    fn test_empty_input() {
        let results = reranker(0.0).rerank("query", Vec::new());
        assert!(results.is_empty());
    }
}

//! Context assembly: selecting a token-bounded subset of reranked results
//! and emitting citation-annotated context for downstream generation.
//!
//! Token counts are estimated as `ceil(chars / 4)`, a fixed approximation
//! shared with [`super::text::estimate_tokens`], not a real tokenizer.

use super::text::{estimate_tokens, jaccard_similarity};
use super::types::{Citation, SearchResult};
use crate::config::{
    CONTEXT_DEDUP_THRESHOLD, DEFAULT_MAX_CONTEXT_CHUNKS, DEFAULT_MAX_CONTEXT_TOKENS,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Budget limits for an assembled context.
#[derive(Debug, Clone)]
pub struct ContextBudget {
    /// Maximum number of accepted chunks
    pub max_chunks: usize,
    /// Maximum estimated token total
    pub max_tokens: usize,
    /// Jaccard threshold for the final dedup pass. Stricter than the
    /// reranker's diversity threshold: near-duplicates that survived
    /// reranking are more harmful once actually placed in a shared
    /// context window.
    pub dedup_threshold: f32,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            max_chunks: DEFAULT_MAX_CONTEXT_CHUNKS,
            max_tokens: DEFAULT_MAX_CONTEXT_TOKENS,
            dedup_threshold: CONTEXT_DEDUP_THRESHOLD,
        }
    }
}

/// A single accepted passage with its citation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Passage text
    pub text: String,
    /// Citation metadata (source, approximate chunk reference, date)
    pub citation: Citation,
    /// Fused score, for caller-side display confidence
    pub score: f32,
    /// Estimated token count of this passage
    pub estimated_tokens: usize,
}

/// Citation-annotated context ready for downstream generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledContext {
    /// Accepted passages in rank order
    pub entries: Vec<ContextEntry>,
    /// Sum of the entries' estimated token counts
    pub total_tokens: usize,
}

/// Selects a budget-bounded subset of reranked results.
///
/// Greedily accepts candidates in rank order until either limit would be
/// exceeded, then stops; a candidate that would overflow the token budget
/// is never partially included. A final dedup pass (at the stricter
/// [`ContextBudget::dedup_threshold`]) then removes any near-duplicates
/// that survived reranking.
pub fn assemble_context(results: &[SearchResult], budget: &ContextBudget) -> AssembledContext {
    let mut accepted: Vec<&SearchResult> = Vec::new();
    let mut total_tokens = 0usize;

    for result in results {
        if accepted.len() >= budget.max_chunks {
            break;
        }
        let tokens = estimate_tokens(&result.text);
        if total_tokens + tokens > budget.max_tokens {
            break;
        }
        total_tokens += tokens;
        accepted.push(result);
    }

    // Final dedup on the accepted set only.
    let mut entries: Vec<ContextEntry> = Vec::with_capacity(accepted.len());
    for result in accepted {
        let duplicate = entries
            .iter()
            .any(|e| jaccard_similarity(&e.text, &result.text) > budget.dedup_threshold);
        if duplicate {
            continue;
        }
        entries.push(ContextEntry {
            text: result.text.clone(),
            citation: result.citation.clone(),
            score: result.score,
            estimated_tokens: estimate_tokens(&result.text),
        });
    }

    let total_tokens = entries.iter().map(|e| e.estimated_tokens).sum();
    debug!(
        candidates = results.len(),
        accepted = entries.len(),
        total_tokens,
        "Assembled context"
    );

    AssembledContext {
        entries,
        total_tokens,
    }
}

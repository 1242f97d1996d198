//! Production configuration constants.
//!
//! This module contains the tuning constants used throughout the retrieval
//! pipeline. They are referenced by both the engine and the tests so that
//! scoring behavior stays consistent and reproducible.

use std::time::Duration;

// =============================================================================
// BM25 Parameters
// =============================================================================

/// BM25 term-frequency saturation parameter (k1).
///
/// Controls how quickly repeated occurrences of a query term stop adding
/// score. The standard Okapi value of 1.2 is used; changing it invalidates
/// any score-parity expectations against a persisted index.
pub const BM25_K1: f32 = 1.2;

/// BM25 length-normalization parameter (b).
///
/// 0.0 disables document-length normalization; 1.0 normalizes fully.
/// The standard Okapi value of 0.75 is used.
pub const BM25_B: f32 = 0.75;

// =============================================================================
// Score Fusion
// =============================================================================

/// Standard RRF k parameter value from academic literature.
///
/// This constant (60) is the recommended value from the original RRF paper:
/// "Reciprocal Rank Fusion outperforms Condorcet and individual Rank Learning
/// Methods" by Cormack, Clarke, and Buettcher (SIGIR 2009).
///
/// The k parameter controls how much weight is given to top-ranked items:
/// - Smaller k → more emphasis on top results
/// - Larger k → more uniform weighting across ranks
/// - k=60 provides a good balance in most IR scenarios
pub const RRF_K: usize = 60;

/// Cap used to squash unbounded BM25 scores into [0, 1] for the weighted
/// and max fusion strategies: `min(score / KEYWORD_NORM_CAP, 1.0)`.
///
/// This is a fixed heuristic, not an adaptive normalization. It is a
/// tunable, not a principled constant; RRF fusion avoids it entirely and
/// is the default strategy for exactly that reason.
pub const KEYWORD_NORM_CAP: f32 = 10.0;

/// Default vector-path weight for weighted fusion.
pub const DEFAULT_VECTOR_WEIGHT: f32 = 0.6;

/// Default keyword-path weight for weighted fusion.
///
/// `DEFAULT_VECTOR_WEIGHT + DEFAULT_KEYWORD_WEIGHT` is expected to equal 1.
/// This is not enforced; callers supplying their own weights should
/// normalize them.
pub const DEFAULT_KEYWORD_WEIGHT: f32 = 0.4;

// =============================================================================
// Reranking
// =============================================================================

/// Jaccard similarity threshold above which two candidates are considered
/// near-duplicates during reranking.
pub const DIVERSITY_THRESHOLD: f32 = 0.3;

/// Stricter Jaccard threshold applied by the context assembler's final
/// dedup pass. Near-duplicates are more harmful once they actually occupy
/// a shared context window, so the assembler tolerates less overlap.
pub const CONTEXT_DEDUP_THRESHOLD: f32 = 0.6;

/// Recency boost for content dated within the last 7 days.
pub const RECENCY_BOOST_WEEK: f32 = 1.2;

/// Recency boost for content dated within the last 30 days.
pub const RECENCY_BOOST_MONTH: f32 = 1.1;

/// Neutral multiplier for content dated within the last 90 days.
pub const RECENCY_BOOST_QUARTER: f32 = 1.0;

/// Penalty multiplier for content older than 90 days.
pub const RECENCY_PENALTY_OLD: f32 = 0.9;

/// Boost applied when the full query appears verbatim in candidate text.
pub const PHRASE_MATCH_BOOST: f32 = 1.3;

/// Boost applied when candidate text contains a markdown heading marker.
pub const HEADING_BOOST: f32 = 1.15;

/// Boost applied when candidate text contains a fenced code block.
pub const CODE_BLOCK_BOOST: f32 = 1.1;

// =============================================================================
// Context Assembly
// =============================================================================

/// Approximate characters per token for English text.
///
/// English text averages ~4 characters per token with most tokenizers.
/// Used by the assembler's token-budget estimate; this is a fixed
/// approximation, not a real tokenizer.
pub const CHARS_PER_TOKEN_ESTIMATE: usize = 4;

/// Default maximum number of chunks accepted into an assembled context.
pub const DEFAULT_MAX_CONTEXT_CHUNKS: usize = 8;

/// Default token budget for an assembled context.
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 2000;

// =============================================================================
// Retrieval Orchestration
// =============================================================================

/// Maximum characters of query text fed to the embedding provider.
///
/// Overlong input is truncated here (on a char boundary) rather than
/// requiring callers to pre-truncate.
pub const EMBED_MAX_CHARS: usize = 8192;

/// Default per-path retrieval timeout.
pub const DEFAULT_RETRIEVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default candidate-pool size fetched from each retrieval path before
/// fusion. Larger than the typical final result count so fusion has
/// enough material to rerank from.
pub const DEFAULT_CANDIDATE_POOL: usize = 20;

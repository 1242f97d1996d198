//! Core types for the hybrid retrieval pipeline.

use crate::config;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A retrievable unit of text.
///
/// Documents are produced by the external ingestion/chunking collaborator
/// and are read-only within the retrieval core. A document set is
/// (re)materialized wholesale when the BM25 index is rebuilt; there is no
/// in-place single-document update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable unique identifier within a corpus snapshot
    pub id: String,
    /// Raw content (bounded length, typically a few thousand chars per chunk)
    pub text: String,
    /// Provenance label (file path or logical name)
    pub source: String,
    /// Category tag (e.g. "long_term", "daily_log"). Opaque to the core;
    /// used only for filtering/boosting by callers.
    #[serde(default)]
    pub source_type: String,
    /// Timestamp of content origin (not ingestion time), used for recency
    /// boosting
    pub date: DateTime<Utc>,
    /// Position of this chunk within its source document, used for
    /// citation chunk-reference approximation
    #[serde(default)]
    pub chunk_index: usize,
}

/// A single hit returned by the external vector store.
///
/// `distance` follows the smaller-is-more-similar convention; the
/// [`VectorQuery`](super::vector::VectorQuery) adapter converts it to a
/// similarity score via `1 - distance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorHit {
    /// Document identifier
    pub id: String,
    /// Document text
    pub text: String,
    /// Provenance label
    pub source: String,
    /// Category tag
    #[serde(default)]
    pub source_type: String,
    /// Content-origin timestamp
    pub date: DateTime<Utc>,
    /// Chunk position within the source
    #[serde(default)]
    pub chunk_index: usize,
    /// Distance from the query embedding (smaller = more similar)
    pub distance: f32,
}

/// A document scored by one or both retrieval paths during a single query.
///
/// Created fresh per query by merging the two ranked lists on document id;
/// discarded after the query completes. A candidate retrieved by only one
/// path has the other score fixed at exactly 0 (never absent) so fusion
/// math is always well-defined.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalCandidate {
    /// Document identifier
    pub id: String,
    /// Document text
    pub text: String,
    /// Provenance label
    pub source: String,
    /// Category tag
    pub source_type: String,
    /// Content-origin timestamp
    pub date: DateTime<Utc>,
    /// Chunk position within the source
    pub chunk_index: usize,
    /// Similarity score in [0, 1] from the vector path (0 if not retrieved
    /// by that path)
    pub vector_score: f32,
    /// BM25 score, non-negative and unbounded (0 if not retrieved by that
    /// path)
    pub keyword_score: f32,
    /// Output of score fusion; meaning depends on the fusion method
    pub fused_score: f32,
}

/// Citation metadata derived from a retrieval candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Provenance label (file path or logical name)
    pub source: String,
    /// Approximate chunk reference within the source, derived from the
    /// candidate's chunk index (e.g. "notes.md#chunk3")
    pub reference: String,
    /// Content-origin timestamp
    pub date: DateTime<Utc>,
}

impl Citation {
    /// Builds a citation for a chunk of a source document.
    pub fn for_chunk(source: &str, chunk_index: usize, date: DateTime<Utc>) -> Self {
        Self {
            source: source.to_string(),
            reference: format!("{source}#chunk{chunk_index}"),
            date,
        }
    }
}

/// Final search output unit: a fused, reranked candidate with citation
/// fields for caller-side display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Document identifier
    pub id: String,
    /// Document text
    pub text: String,
    /// Final fused relevance score (after reranking adjustments)
    pub score: f32,
    /// Similarity score from the vector path (0 if that path did not
    /// retrieve this document)
    pub vector_score: f32,
    /// BM25 score from the keyword path (0 if that path did not retrieve
    /// this document)
    pub keyword_score: f32,
    /// Category tag
    pub source_type: String,
    /// Citation metadata for display
    pub citation: Citation,
}

impl SearchResult {
    /// Converts a reranked candidate into a caller-facing result.
    pub fn from_candidate(c: RetrievalCandidate) -> Self {
        let citation = Citation::for_chunk(&c.source, c.chunk_index, c.date);
        Self {
            id: c.id,
            text: c.text,
            score: c.fused_score,
            vector_score: c.vector_score,
            keyword_score: c.keyword_score,
            source_type: c.source_type,
            citation,
        }
    }
}

/// Strategy for combining the keyword-ranked and vector-ranked lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionMethod {
    /// Reciprocal Rank Fusion: rank-position based, robust to the two
    /// scoring scales without tuning. The default.
    Rrf,
    /// Weighted blend of vector score and capped-normalized BM25 score.
    Weighted,
    /// Max of vector score and capped-normalized BM25 score. Conservative:
    /// never penalizes a document strong in only one path.
    Max,
}

impl Default for FusionMethod {
    fn default() -> Self {
        FusionMethod::Rrf
    }
}

impl fmt::Display for FusionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FusionMethod::Rrf => write!(f, "rrf"),
            FusionMethod::Weighted => write!(f, "weighted"),
            FusionMethod::Max => write!(f, "max"),
        }
    }
}

impl FromStr for FusionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rrf" => Ok(FusionMethod::Rrf),
            "weighted" => Ok(FusionMethod::Weighted),
            "max" => Ok(FusionMethod::Max),
            other => Err(format!(
                "unknown fusion method '{other}' (expected rrf, weighted, or max)"
            )),
        }
    }
}

/// Per-query search options.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Final result count
    pub limit: usize,
    /// Minimum fused score a result must reach to be returned
    pub min_score: f32,
    /// Fusion strategy
    pub fusion_method: FusionMethod,
    /// Vector-path weight for weighted fusion
    pub vector_weight: f32,
    /// Keyword-path weight for weighted fusion
    pub keyword_weight: f32,
    /// Candidate-pool size requested from the vector path (larger than
    /// `limit` to give fusion enough material)
    pub vector_limit: usize,
    /// Candidate-pool size requested from the keyword path
    pub keyword_limit: usize,
    /// Per-path retrieval timeout
    pub timeout: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_score: 0.0,
            fusion_method: FusionMethod::default(),
            vector_weight: config::DEFAULT_VECTOR_WEIGHT,
            keyword_weight: config::DEFAULT_KEYWORD_WEIGHT,
            vector_limit: config::DEFAULT_CANDIDATE_POOL,
            keyword_limit: config::DEFAULT_CANDIDATE_POOL,
            timeout: config::DEFAULT_RETRIEVAL_TIMEOUT,
        }
    }
}

/// Per-query diagnostics returned alongside results.
///
/// Degraded (single-path) queries are surfaced here, never as errors:
/// downstream consumers can tell "nothing relevant found" apart from
/// "a retrieval path was down" by checking the path counts and notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStats {
    /// Wall-clock query time in milliseconds
    pub query_time_ms: u64,
    /// Number of candidates returned by the vector path (0 when that path
    /// failed or found nothing)
    pub vector_result_count: usize,
    /// Number of candidates returned by the keyword path
    pub keyword_result_count: usize,
    /// Fusion strategy used for this query
    pub fusion_method: FusionMethod,
    /// Unique candidates after merging both paths
    pub total_candidates: usize,
    /// Non-fatal path failures (degraded mode), one note per failed path
    pub degraded: Vec<String>,
}

/// Results plus diagnostics for a single query.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    /// Reranked results in descending adjusted-score order
    pub results: Vec<SearchResult>,
    /// Per-query diagnostics
    pub stats: SearchStats,
}

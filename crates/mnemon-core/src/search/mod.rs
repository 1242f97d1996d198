//! Hybrid retrieval pipeline.
//!
//! Combines two independent retrieval paths over the same corpus:
//!
//! - **Keyword path**: an in-memory Okapi BM25 index ([`bm25`])
//! - **Vector path**: an external embedding provider plus vector store,
//!   consumed through trait seams ([`vector`])
//!
//! A query runs both paths concurrently, merges the ranked lists by
//! document id, fuses the per-path scores ([`fusion`]), reranks the fused
//! list ([`rerank`]), and optionally assembles a citation-annotated,
//! token-budgeted context from the top results ([`assemble`]). The
//! [`engine`] module owns the orchestration, including per-path timeouts
//! and graceful single-path degradation.

pub mod assemble;
pub mod bm25;
pub mod engine;
pub mod fusion;
pub mod rerank;
pub mod text;
pub mod types;
pub mod vector;

pub use assemble::{assemble_context, AssembledContext, ContextBudget, ContextEntry};
pub use bm25::{Bm25Index, BuildStats, IndexedDocument};
pub use engine::{ComparisonReport, HybridSearchEngine};
pub use fusion::{max_fusion, normalize_keyword_score, reciprocal_rank_fusion, weighted_fusion};
pub use rerank::{diversity_filter, RerankConfig, Reranker};
pub use types::{
    Citation, Document, FusionMethod, RetrievalCandidate, SearchOptions, SearchResponse,
    SearchResult, SearchStats, VectorHit,
};
pub use vector::{
    EmbeddingProvider, HashingEmbedder, InMemoryVectorStore, VectorQuery, VectorResult,
    VectorStore,
};

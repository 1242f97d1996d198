//! # Mnemon Core
//!
//! Hybrid retrieval engine used to ground generated responses with cited
//! source passages. Combines BM25 keyword search with vector similarity,
//! fuses the two rankings, reranks for diversity/recency, and assembles a
//! token-bounded, citation-annotated context.
//!
//! ## Modules
//!
//! - [`search`] - Hybrid search (BM25 keyword + vector similarity + score fusion)
//! - [`storage`] - BM25 index snapshot persistence with atomic replacement
//! - [`evaluation`] - IR quality metrics (precision@k, recall@k, MRR, NDCG)
//! - [`config`] - Tuning constants (BM25 parameters, fusion defaults, boost tiers)
//! - [`error`] - Error taxonomy for retrieval operations
//!
//! The embedding provider and the vector store are external collaborators,
//! consumed through the [`search::EmbeddingProvider`] and [`search::VectorStore`]
//! traits. Everything else (index construction, scoring, fusion, reranking,
//! context assembly) is implemented here.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod search;
pub mod storage;

//! Vector retrieval path: trait seams for the external collaborators and
//! the thin query adapter over them.
//!
//! The embedding provider and the vector store are external to this core.
//! They are consumed through the [`EmbeddingProvider`] and [`VectorStore`]
//! traits; [`VectorQuery`] is the adapter that embeds a query, issues the
//! similarity lookup, and orients scores so that higher is always better
//! (matching BM25's orientation).
//!
//! [`InMemoryVectorStore`] and [`HashingEmbedder`] are self-contained
//! implementations used by tests and the CLI demo path. The hashing
//! embedder is a deterministic fixture, not a semantic model.

use super::types::VectorHit;
use crate::config::EMBED_MAX_CHARS;
use crate::error::RetrievalError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Turns text into a fixed-length numeric vector.
///
/// Failures surface as [`RetrievalError::EmbeddingUnavailable`] so callers
/// can tell "no matches" apart from "retrieval subsystem down".
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single text into a vector of [`Self::dimension`] floats.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;

    /// Fixed output dimensionality.
    fn dimension(&self) -> usize;
}

/// Persists vectors and returns nearest neighbors by similarity.
///
/// `distance` in returned hits is interpreted as smaller-is-more-similar;
/// the adapter converts it via `1 - distance`. Failures surface as
/// [`RetrievalError::VectorStoreUnavailable`].
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Returns up to `limit` nearest hits for the query embedding. Fewer
    /// results than requested is not an error.
    async fn query(&self, embedding: &[f32], limit: usize) -> Result<Vec<VectorHit>, RetrievalError>;
}

#[async_trait]
impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<T> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        (**self).embed(text).await
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }
}

#[async_trait]
impl<T: VectorStore + ?Sized> VectorStore for Arc<T> {
    async fn query(&self, embedding: &[f32], limit: usize) -> Result<Vec<VectorHit>, RetrievalError> {
        (**self).query(embedding, limit).await
    }
}

/// A vector-path result with the distance already converted to a
/// higher-is-better similarity score in [0, 1].
#[derive(Debug, Clone)]
pub struct VectorResult {
    /// The underlying store hit
    pub hit: VectorHit,
    /// `1 - distance`, clamped to [0, 1]
    pub score: f32,
}

/// Thin adapter issuing a similarity query against the external vector
/// store using a query embedding.
pub struct VectorQuery<E, V> {
    embedder: E,
    store: V,
}

impl<E: EmbeddingProvider, V: VectorStore> VectorQuery<E, V> {
    /// Creates an adapter over the given collaborators.
    pub fn new(embedder: E, store: V) -> Self {
        Self { embedder, store }
    }

    /// Embeds `query` (truncated to [`EMBED_MAX_CHARS`] chars) and returns
    /// up to `limit` hits with scores oriented higher-is-better.
    ///
    /// Embedding failures propagate as
    /// [`RetrievalError::EmbeddingUnavailable`] rather than silently
    /// returning an empty list.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<VectorResult>, RetrievalError> {
        let truncated = truncate_chars(query, EMBED_MAX_CHARS);
        let embedding = self.embedder.embed(truncated).await?;
        let hits = self.store.query(&embedding, limit).await?;

        debug!(requested = limit, returned = hits.len(), "Vector query completed");

        Ok(hits
            .into_iter()
            .map(|hit| {
                let score = (1.0 - hit.distance).clamp(0.0, 1.0);
                VectorResult { hit, score }
            })
            .collect())
    }
}

/// Truncates on a char boundary without allocating.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

// ============================================================================
// In-memory implementations (tests and CLI demo corpus)
// ============================================================================

/// Brute-force cosine vector store backed by a `Vec`.
///
/// Suitable for test corpora and the CLI demo path; a production vector
/// store with approximate nearest-neighbor search lives outside this core.
#[derive(Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<StoredVector>>,
}

struct StoredVector {
    id: String,
    text: String,
    source: String,
    source_type: String,
    date: DateTime<Utc>,
    chunk_index: usize,
    embedding: Vec<f32>,
}

impl InMemoryVectorStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vector with its document metadata.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &self,
        id: &str,
        text: &str,
        source: &str,
        source_type: &str,
        date: DateTime<Utc>,
        chunk_index: usize,
        embedding: Vec<f32>,
    ) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.push(StoredVector {
            id: id.to_string(),
            text: text.to_string(),
            source: source.to_string(),
            source_type: source_type.to_string(),
            date,
            chunk_index,
            embedding,
        });
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns `true` if the store holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 1.0; // Maximum useful distance for zero vectors
    }

    1.0 - dot / (mag_a * mag_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn query(&self, embedding: &[f32], limit: usize) -> Result<Vec<VectorHit>, RetrievalError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());

        let mut hits: Vec<VectorHit> = entries
            .iter()
            .map(|entry| VectorHit {
                id: entry.id.clone(),
                text: entry.text.clone(),
                source: entry.source.clone(),
                source_type: entry.source_type.clone(),
                date: entry.date,
                chunk_index: entry.chunk_index,
                distance: cosine_distance(embedding, &entry.embedding),
            })
            .collect();

        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Deterministic feature-hashing embedder.
///
/// Hashes each token into a fixed-size bucket vector and L2-normalizes.
/// Identical input always yields an identical vector, which makes it a
/// usable stand-in for a real model in tests and the offline CLI demo.
/// It captures term overlap, not semantics.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Default fixture dimensionality.
    pub const DEFAULT_DIMENSION: usize = 256;

    /// Creates an embedder with the given output dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Synchronous embedding used when no async context is available.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for term in super::text::tokenize(text) {
            let mut hasher = DefaultHasher::new();
            term.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            vector[bucket] += 1.0;
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_date() -> DateTime<Utc> {
        Utc::now()
    }

    #[tokio::test]
    async fn test_adapter_converts_distance_to_similarity() {
        let embedder = HashingEmbedder::default();
        let store = InMemoryVectorStore::new();
        store.add(
            "d1",
            "rust systems programming",
            "d1.md",
            "long_term",
            hit_date(),
            0,
            embedder.embed_sync("rust systems programming"),
        );

        let query = VectorQuery::new(HashingEmbedder::default(), store);
        let results = query.search("rust systems programming", 5).await.unwrap();

        assert_eq!(results.len(), 1);
        // Identical text → distance ~0 → score ~1.
        assert!(results[0].score > 0.99);
        assert!(results[0].score <= 1.0);
    }

    #[tokio::test]
    async fn test_adapter_tolerates_short_result_lists() {
        let query = VectorQuery::new(HashingEmbedder::default(), InMemoryVectorStore::new());
        let results = query.search("anything", 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_is_distinguishable() {
        struct BrokenEmbedder;

        #[async_trait]
        impl EmbeddingProvider for BrokenEmbedder {
            async fn embed(&self, _text: &str) -> Result<Vec<f32>, RetrievalError> {
                Err(RetrievalError::EmbeddingUnavailable("model offline".into()))
            }
            fn dimension(&self) -> usize {
                8
            }
        }

        let query = VectorQuery::new(BrokenEmbedder, InMemoryVectorStore::new());
        let err = query.search("query", 5).await.unwrap_err();
        assert!(matches!(err, RetrievalError::EmbeddingUnavailable(_)));
    }

    #[test]
    fn test_hashing_embedder_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed_sync("the quick brown fox");
        let b = embedder.embed_sync("the quick brown fox");
        assert_eq!(a, b);

        let magnitude: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multibyte chars must not be split mid-codepoint.
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_cosine_distance_zero_vector() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }
}

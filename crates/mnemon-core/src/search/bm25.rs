//! Okapi BM25 keyword index.
//!
//! An in-memory inverted-index-like structure over a fixed document
//! snapshot. Unlike a general-purpose search library, this index persists
//! exact per-document term-frequency maps so that a deserialized snapshot
//! reproduces search scores bit-for-bit, a requirement for reproducible
//! grounding citations.
//!
//! # Algorithm
//!
//! For a query Q and document D:
//!
//! ```text
//! score(D,Q) = Σ_{t∈Q} IDF(t) · f(t,D)·(k1+1) / (f(t,D) + k1·(1 − b + b·|D|/avgdl))
//! IDF(t)     = ln((N − df(t) + 0.5) / (df(t) + 0.5) + 1)
//! ```
//!
//! with `k1 = 1.2`, `b = 0.75` (see [`crate::config`]).
//!
//! # Lifecycle
//!
//! Built from a full document snapshot via [`Bm25Index::build`]; rebuilt
//! (never incrementally patched) whenever the corpus changes materially.
//! The index is read-only after construction, so arbitrarily many
//! concurrent searches may share it without locking.

use super::text::tokenize;
use super::types::Document;
use crate::config::{BM25_K1, BM25_B};
use crate::error::RetrievalError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// A document augmented with the statistics BM25 scoring needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Stable unique identifier
    pub id: String,
    /// Raw text content
    pub text: String,
    /// Provenance label
    pub source: String,
    /// Category tag (opaque to the core)
    pub source_type: String,
    /// Content-origin timestamp
    pub date: DateTime<Utc>,
    /// Chunk position within the source
    pub chunk_index: usize,
    /// Exact per-term occurrence counts for this document
    pub term_frequencies: HashMap<String, u32>,
    /// Total token count (document length |D|)
    pub token_count: usize,
}

/// Statistics from an index build.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BuildStats {
    /// Documents indexed (including zero-token documents)
    pub indexed: usize,
    /// Malformed documents skipped (empty id)
    pub skipped: usize,
}

/// Serialized snapshot layout.
///
/// Carries the full per-document term-frequency maps, not a bag-of-words
/// digest, plus the global document-frequency map, the average document
/// length at full floating-point precision, and the document count. The
/// file is fully rebuilt (never patched) on every reindex.
#[derive(Debug, Serialize, Deserialize)]
struct Bm25Snapshot {
    documents: Vec<IndexedDocument>,
    document_frequency: HashMap<String, u32>,
    average_document_length: f64,
    total_documents: usize,
    k1: f32,
    b: f32,
}

/// In-memory BM25 index over a corpus snapshot.
///
/// # Thread Safety
///
/// The index is immutable after construction. Share it behind an `Arc`
/// and swap the `Arc` on rebuild; concurrent readers never observe a
/// half-built index.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    /// Indexed documents in build order
    documents: Vec<IndexedDocument>,
    /// term → number of documents containing that term
    document_frequency: HashMap<String, u32>,
    /// Mean token count across all indexed documents
    average_document_length: f64,
    /// Count of indexed documents
    total_documents: usize,
    /// Document id → position in `documents` (rebuilt on deserialize)
    positions: HashMap<String, usize>,
    /// Term-frequency saturation parameter
    k1: f32,
    /// Length-normalization parameter
    b: f32,
}

impl Bm25Index {
    /// Creates an empty index with the default Okapi parameters.
    pub fn empty() -> Self {
        Self {
            documents: Vec::new(),
            document_frequency: HashMap::new(),
            average_document_length: 0.0,
            total_documents: 0,
            positions: HashMap::new(),
            k1: BM25_K1,
            b: BM25_B,
        }
    }

    /// Builds an index from a full document snapshot.
    ///
    /// Tokenizes each document, computes per-document term-frequency maps
    /// and lengths, then derives the corpus document-frequency map and the
    /// average document length together, so the returned index is always
    /// internally consistent. Zero-token documents are indexed (they count
    /// toward `total_documents` and the average length) but can never
    /// match a query.
    ///
    /// Documents with an empty `id` are skipped and counted in
    /// [`BuildStats::skipped`], a diagnostic, not a hard failure.
    /// Duplicate ids: last write wins (a deliberate policy, matching
    /// map-based construction).
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn build(documents: &[Document]) -> (Self, BuildStats) {
        let mut indexed: Vec<IndexedDocument> = Vec::with_capacity(documents.len());
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(documents.len());
        let mut skipped = 0usize;

        for doc in documents {
            if doc.id.is_empty() {
                warn!(source = %doc.source, "Skipping document with empty id");
                skipped += 1;
                continue;
            }

            let terms = tokenize(&doc.text);
            let token_count = terms.len();
            let mut term_frequencies: HashMap<String, u32> = HashMap::new();
            for term in terms {
                *term_frequencies.entry(term).or_insert(0) += 1;
            }

            let record = IndexedDocument {
                id: doc.id.clone(),
                text: doc.text.clone(),
                source: doc.source.clone(),
                source_type: doc.source_type.clone(),
                date: doc.date,
                chunk_index: doc.chunk_index,
                term_frequencies,
                token_count,
            };

            match positions.get(&doc.id) {
                // Last write wins for duplicate ids
                Some(&pos) => indexed[pos] = record,
                None => {
                    positions.insert(doc.id.clone(), indexed.len());
                    indexed.push(record);
                }
            }
        }

        // Corpus statistics are derived together from the final document
        // set, so document_frequency and average_document_length can never
        // disagree with `documents`.
        let mut document_frequency: HashMap<String, u32> = HashMap::new();
        let mut total_tokens = 0usize;
        for doc in &indexed {
            total_tokens += doc.token_count;
            for term in doc.term_frequencies.keys() {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        let total_documents = indexed.len();
        let average_document_length = if total_documents > 0 {
            total_tokens as f64 / total_documents as f64
        } else {
            0.0
        };

        debug!(
            indexed = total_documents,
            skipped,
            terms = document_frequency.len(),
            avgdl = average_document_length,
            "Built BM25 index"
        );

        (
            Self {
                documents: indexed,
                document_frequency,
                average_document_length,
                total_documents,
                positions,
                k1: BM25_K1,
                b: BM25_B,
            },
            BuildStats {
                indexed: total_documents,
                skipped,
            },
        )
    }

    /// Searches the index, returning up to `limit` documents with strictly
    /// positive BM25 score, sorted descending. Ties break by indexed order
    /// (deterministic). An empty or unmatchable query returns an empty
    /// list, not an error.
    pub fn search(&self, query: &str, limit: usize) -> Vec<(String, f32)> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() || self.total_documents == 0 {
            return Vec::new();
        }

        let n = self.total_documents as f32;
        let mut scored: Vec<(usize, f32)> = Vec::new();

        for (pos, doc) in self.documents.iter().enumerate() {
            let mut score = 0.0f32;
            for term in &query_terms {
                let tf = match doc.term_frequencies.get(term) {
                    Some(&tf) => tf as f32,
                    None => continue,
                };
                let df = *self.document_frequency.get(term).unwrap_or(&0) as f32;
                let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

                let length_ratio = if self.average_document_length > 0.0 {
                    doc.token_count as f64 / self.average_document_length
                } else {
                    0.0
                } as f32;
                let denom = tf + self.k1 * (1.0 - self.b + self.b * length_ratio);
                score += idf * (tf * (self.k1 + 1.0)) / denom;
            }
            if score > 0.0 {
                scored.push((pos, score));
            }
        }

        // Stable sort keeps indexed order for tied scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(pos, score)| (self.documents[pos].id.clone(), score))
            .collect()
    }

    /// Looks up an indexed document by id.
    pub fn get(&self, id: &str) -> Option<&IndexedDocument> {
        self.positions.get(id).map(|&pos| &self.documents[pos])
    }

    /// Returns the number of indexed documents.
    pub fn len(&self) -> usize {
        self.total_documents
    }

    /// Returns `true` if no documents are indexed.
    pub fn is_empty(&self) -> bool {
        self.total_documents == 0
    }

    /// Mean token count across all indexed documents.
    pub fn average_document_length(&self) -> f64 {
        self.average_document_length
    }

    /// Serializes the index to a snapshot blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RetrievalError> {
        let snapshot = Bm25Snapshot {
            documents: self.documents.clone(),
            document_frequency: self.document_frequency.clone(),
            average_document_length: self.average_document_length,
            total_documents: self.total_documents,
            k1: self.k1,
            b: self.b,
        };
        serde_json::to_vec(&snapshot).map_err(|e| RetrievalError::Storage(e.to_string()))
    }

    /// Deserializes a snapshot blob, restoring all per-term frequency maps
    /// and corpus statistics exactly.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::IndexCorrupt`] if the blob fails parsing
    /// or structural validation; callers should rebuild from the source
    /// corpus rather than operate on a partial index.
    pub fn from_bytes(blob: &[u8]) -> Result<Self, RetrievalError> {
        let snapshot: Bm25Snapshot = serde_json::from_slice(blob)
            .map_err(|e| RetrievalError::IndexCorrupt(e.to_string()))?;

        if snapshot.total_documents != snapshot.documents.len() {
            return Err(RetrievalError::IndexCorrupt(format!(
                "document count mismatch: manifest says {}, snapshot holds {}",
                snapshot.total_documents,
                snapshot.documents.len()
            )));
        }
        if !snapshot.average_document_length.is_finite() || snapshot.average_document_length < 0.0 {
            return Err(RetrievalError::IndexCorrupt(format!(
                "invalid average document length: {}",
                snapshot.average_document_length
            )));
        }

        let positions: HashMap<String, usize> = snapshot
            .documents
            .iter()
            .enumerate()
            .map(|(pos, doc)| (doc.id.clone(), pos))
            .collect();

        Ok(Self {
            documents: snapshot.documents,
            document_frequency: snapshot.document_frequency,
            average_document_length: snapshot.average_document_length,
            total_documents: snapshot.total_documents,
            positions,
            k1: snapshot.k1,
            b: snapshot.b,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc(id: &str, text: &str) -> Document {
        Document {
            id: id.to_string(),
            text: text.to_string(),
            source: format!("{id}.md"),
            source_type: "long_term".to_string(),
            date: Utc::now(),
            chunk_index: 0,
        }
    }

    #[test]
    fn test_quick_brown_matches_both_foxes() {
        let docs = vec![
            doc("d1", "the quick brown fox"),
            doc("d2", "a quick brown dog"),
            doc("d3", "deep learning neural networks"),
        ];
        let (index, stats) = Bm25Index::build(&docs);
        assert_eq!(stats.indexed, 3);
        assert_eq!(stats.skipped, 0);

        let results = index.search("quick brown", 10);

        // d1 and d2 match with positive scores; d3 is absent entirely.
        assert_eq!(results.len(), 2);
        let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert!(ids.contains(&"d1"));
        assert!(ids.contains(&"d2"));
        assert!(results.iter().all(|(_, score)| *score > 0.0));
    }

    #[test]
    fn test_term_frequency_raises_score() {
        let docs = vec![
            doc("once", "rust programming"),
            doc("thrice", "rust rust rust is a programming language"),
            doc("none", "python programming"),
        ];
        let (index, _) = Bm25Index::build(&docs);

        let results = index.search("rust", 10);
        assert_eq!(results.len(), 2);
        let score_of = |id: &str| {
            results
                .iter()
                .find(|(rid, _)| rid == id)
                .map(|(_, s)| *s)
                .unwrap()
        };
        assert!(score_of("thrice") > score_of("once"));
    }

    #[test]
    fn test_empty_query_returns_empty() {
        let (index, _) = Bm25Index::build(&[doc("d1", "some text")]);
        assert!(index.search("", 10).is_empty());
        assert!(index.search("...!!!", 10).is_empty());
    }

    #[test]
    fn test_empty_index_returns_empty() {
        let index = Bm25Index::empty();
        assert!(index.search("anything", 10).is_empty());
    }

    #[test]
    fn test_limit_truncates() {
        let docs: Vec<Document> = (0..10)
            .map(|i| doc(&format!("d{i}"), "shared term plus filler"))
            .collect();
        let (index, _) = Bm25Index::build(&docs);
        assert_eq!(index.search("shared", 3).len(), 3);
    }

    #[test]
    fn test_search_is_deterministic() {
        let docs = vec![
            doc("a", "alpha beta gamma"),
            doc("b", "alpha beta"),
            doc("c", "alpha"),
        ];
        let (index, _) = Bm25Index::build(&docs);
        let first = index.search("alpha beta", 10);
        for _ in 0..5 {
            assert_eq!(index.search("alpha beta", 10), first);
        }
    }

    #[test]
    fn test_zero_token_document_counts_toward_statistics() {
        let docs = vec![doc("words", "four tokens right here"), doc("blank", "!!!")];
        let (index, stats) = Bm25Index::build(&docs);

        assert_eq!(stats.indexed, 2);
        assert_eq!(index.len(), 2);
        // avgdl = (4 + 0) / 2
        assert!((index.average_document_length() - 2.0).abs() < f64::EPSILON);
        // The blank document can never match.
        assert!(index.search("tokens", 10).iter().all(|(id, _)| id == "words"));
    }

    #[test]
    fn test_empty_id_skipped_and_counted() {
        let docs = vec![doc("", "orphan text"), doc("kept", "kept text")];
        let (index, stats) = Bm25Index::build(&docs);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.indexed, 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_duplicate_id_last_write_wins() {
        let docs = vec![doc("d1", "old stale content"), doc("d1", "fresh replacement")];
        let (index, stats) = Bm25Index::build(&docs);

        assert_eq!(stats.indexed, 1);
        assert!(index.search("stale", 10).is_empty());
        let results = index.search("fresh", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "d1");
        assert_eq!(index.get("d1").unwrap().text, "fresh replacement");
    }

    #[test]
    fn test_serialization_round_trip_is_exact() {
        let docs = vec![
            doc("d1", "the quick brown fox jumps over the lazy dog"),
            doc("d2", "a quick brown dog naps in the sun"),
            doc("d3", "deep learning neural networks at scale"),
            doc("d4", ""),
        ];
        let (index, _) = Bm25Index::build(&docs);

        let blob = index.to_bytes().unwrap();
        let restored = Bm25Index::from_bytes(&blob).unwrap();

        assert_eq!(
            restored.average_document_length(),
            index.average_document_length()
        );
        for query in ["quick brown", "lazy dog", "neural", "the", "absent"] {
            // Scores must match to full floating-point precision.
            assert_eq!(restored.search(query, 10), index.search(query, 10));
        }
    }

    #[test]
    fn test_corrupt_blob_rejected() {
        assert!(matches!(
            Bm25Index::from_bytes(b"not json at all"),
            Err(RetrievalError::IndexCorrupt(_))
        ));

        // Structurally valid JSON with an inconsistent manifest count.
        let (index, _) = Bm25Index::build(&[doc("d1", "content here")]);
        let mut value: serde_json::Value =
            serde_json::from_slice(&index.to_bytes().unwrap()).unwrap();
        value["total_documents"] = serde_json::json!(99);
        let tampered = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            Bm25Index::from_bytes(&tampered),
            Err(RetrievalError::IndexCorrupt(_))
        ));
    }
}

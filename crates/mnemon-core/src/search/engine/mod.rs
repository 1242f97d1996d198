//! Hybrid search engine combining vector (semantic) and keyword (BM25)
//! retrieval.
//!
//! This module provides the [`HybridSearchEngine`] which orchestrates:
//! - Embedding-based vector search through the external store seam
//! - BM25 keyword search over an in-memory index snapshot
//! - Score fusion (RRF by default), reranking, and context assembly
//!
//! # Architecture
//!
//! The two retrieval paths run concurrently, each under its own timeout.
//! A single-path failure degrades the query to the surviving path and is
//! reported in [`SearchStats::degraded`], never as an error; only the loss
//! of both paths fails the query.
//!
//! The BM25 index is an immutable snapshot behind `RwLock<Arc<..>>`.
//! Rebuilds construct a fresh index off to the side and swap the `Arc`,
//! so in-flight searches keep scoring against the snapshot they started
//! with and never observe a half-built index.


use super::assemble::{assemble_context, AssembledContext, ContextBudget};
use super::bm25::{Bm25Index, BuildStats};
use super::fusion::{max_fusion, reciprocal_rank_fusion, weighted_fusion};
use super::rerank::{Reranker, RerankConfig};
use super::types::{
    Document, FusionMethod, RetrievalCandidate, SearchOptions, SearchResponse, SearchResult,
    SearchStats,
};
use super::vector::{EmbeddingProvider, VectorQuery, VectorResult, VectorStore};
use crate::config::RRF_K;
use crate::error::RetrievalError;
use chrono::Utc;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Outcome of one retrieval path, folded into degraded-mode bookkeeping.
enum PathOutcome<T> {
    Ok(T),
    Failed { note: String, timed_out: bool },
}

/// Side-by-side results of a vector-only and a hybrid run of the same
/// query, for retrieval-quality comparison.
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    /// Results using only the vector path, scored by similarity
    pub vector_only: Vec<SearchResult>,
    /// Results of the full hybrid pipeline
    pub hybrid: Vec<SearchResult>,
}

/// Hybrid search engine over an embedding provider, a vector store, and an
/// in-memory BM25 snapshot.
pub struct HybridSearchEngine<E, V> {
    embedder: Arc<E>,
    vector_store: Arc<V>,
    index: RwLock<Arc<Bm25Index>>,
}

impl<E: EmbeddingProvider, V: VectorStore> HybridSearchEngine<E, V> {
    /// Creates an engine with an empty keyword index.
    pub fn new(embedder: Arc<E>, vector_store: Arc<V>) -> Self {
        Self {
            embedder,
            vector_store,
            index: RwLock::new(Arc::new(Bm25Index::empty())),
        }
    }

    /// Creates an engine around an already-built keyword index, typically
    /// one loaded from a persisted snapshot.
    pub fn with_index(embedder: Arc<E>, vector_store: Arc<V>, index: Bm25Index) -> Self {
        Self {
            embedder,
            vector_store,
            index: RwLock::new(Arc::new(index)),
        }
    }

    /// Rebuilds the keyword index from a full document snapshot and swaps
    /// it in atomically. In-flight searches finish against the old index.
    ///
    /// A rebuild replaces the snapshot wholesale, so it also recovers a
    /// lock poisoned by an earlier panic.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn rebuild(&self, documents: &[Document]) -> BuildStats {
        let (index, stats) = Bm25Index::build(documents);
        self.install_index(index);
        info!(
            indexed = stats.indexed,
            skipped = stats.skipped,
            "Swapped in rebuilt keyword index"
        );
        stats
    }

    /// Installs an externally built index (e.g. one restored from disk),
    /// replacing the current snapshot atomically.
    pub fn install_index(&self, index: Bm25Index) {
        let mut guard = self.index.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(index);
        drop(guard);
        self.index.clear_poison();
    }

    /// Returns the current keyword index snapshot, e.g. for persistence.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::IndexCorrupt`] if the snapshot lock was
    /// poisoned by a panic; [`Self::rebuild`] or [`Self::install_index`]
    /// recovers from that state.
    pub fn index_snapshot(&self) -> Result<Arc<Bm25Index>, RetrievalError> {
        self.index
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| {
                RetrievalError::IndexCorrupt(
                    "keyword index lock poisoned by a panicked writer".to_string(),
                )
            })
    }

    /// Runs a hybrid query through the full pipeline: concurrent retrieval,
    /// merge, fusion, reranking.
    ///
    /// # Errors
    ///
    /// - [`RetrievalError::InvalidQuery`] for an empty/whitespace query or
    ///   a zero `limit`
    /// - [`RetrievalError::RetrievalTimeout`] when both paths timed out
    /// - [`RetrievalError::RetrievalUnavailable`] when both paths failed
    ///   for mixed reasons
    ///
    /// A single-path failure is NOT an error: the query degrades to the
    /// surviving path and the failure is noted in [`SearchStats::degraded`].
    #[instrument(skip(self, options), fields(fusion = %options.fusion_method))]
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }
        if options.limit == 0 {
            return Err(RetrievalError::InvalidQuery(
                "limit must be at least 1".to_string(),
            ));
        }

        let started = Instant::now();
        let snapshot = self.index_snapshot();

        let vector_query = VectorQuery::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.vector_store),
        );
        let vector_fut = async {
            match timeout(options.timeout, vector_query.search(query, options.vector_limit)).await
            {
                Ok(Ok(results)) => PathOutcome::Ok(results),
                Ok(Err(err)) => PathOutcome::Failed {
                    note: format!("vector path failed: {err}"),
                    timed_out: false,
                },
                Err(_) => PathOutcome::Failed {
                    note: format!("vector path timed out after {:?}", options.timeout),
                    timed_out: true,
                },
            }
        };
        let keyword_fut = async {
            match &snapshot {
                Ok(index) => {
                    let scan = async { index.search(query, options.keyword_limit) };
                    match timeout(options.timeout, scan).await {
                        Ok(results) => PathOutcome::Ok(results),
                        Err(_) => PathOutcome::Failed {
                            note: format!(
                                "keyword path timed out after {:?}",
                                options.timeout
                            ),
                            timed_out: true,
                        },
                    }
                }
                Err(err) => PathOutcome::Failed {
                    note: format!("keyword path failed: {err}"),
                    timed_out: false,
                },
            }
        };

        let (vector_path, keyword_path) = tokio::join!(vector_fut, keyword_fut);

        let mut degraded: Vec<String> = Vec::new();
        let (vector_results, keyword_results) = match (vector_path, keyword_path) {
            (PathOutcome::Ok(v), PathOutcome::Ok(k)) => (v, k),
            (PathOutcome::Ok(v), PathOutcome::Failed { note, .. }) => {
                warn!(%note, "Degrading to vector-only retrieval");
                degraded.push(note);
                (v, Vec::new())
            }
            (PathOutcome::Failed { note, .. }, PathOutcome::Ok(k)) => {
                warn!(%note, "Degrading to keyword-only retrieval");
                degraded.push(note);
                (Vec::new(), k)
            }
            (
                PathOutcome::Failed {
                    note: vector_note,
                    timed_out: vector_timed_out,
                },
                PathOutcome::Failed {
                    note: keyword_note,
                    timed_out: keyword_timed_out,
                },
            ) => {
                if vector_timed_out && keyword_timed_out {
                    return Err(RetrievalError::RetrievalTimeout(options.timeout));
                }
                return Err(RetrievalError::RetrievalUnavailable(format!(
                    "{vector_note}; {keyword_note}"
                )));
            }
        };

        let vector_count = vector_results.len();
        let keyword_count = keyword_results.len();

        // A non-empty keyword list implies the snapshot read succeeded.
        let mut candidates = match snapshot.as_ref() {
            Ok(index) => merge_candidates(index, vector_results, keyword_results),
            Err(_) => merge_candidates(&Bm25Index::empty(), vector_results, Vec::new()),
        };
        let total_candidates = candidates.len();
        fuse(&mut candidates, options);

        let reranker = Reranker::new(RerankConfig {
            min_score: options.min_score,
            now: Utc::now(),
            ..RerankConfig::default()
        });
        let mut reranked = reranker.rerank(query, candidates);
        reranked.truncate(options.limit);

        let results: Vec<SearchResult> = reranked
            .into_iter()
            .map(SearchResult::from_candidate)
            .collect();

        let stats = SearchStats {
            query_time_ms: started.elapsed().as_millis() as u64,
            vector_result_count: vector_count,
            keyword_result_count: keyword_count,
            fusion_method: options.fusion_method,
            total_candidates,
            degraded,
        };
        debug!(
            results = results.len(),
            candidates = stats.total_candidates,
            elapsed_ms = stats.query_time_ms,
            "Search completed"
        );

        Ok(SearchResponse { results, stats })
    }

    /// Runs a hybrid query and assembles a citation-annotated context from
    /// the results under the given budget.
    pub async fn search_with_context(
        &self,
        query: &str,
        options: &SearchOptions,
        budget: &ContextBudget,
    ) -> Result<(AssembledContext, SearchStats), RetrievalError> {
        let response = self.search(query, options).await?;
        let context = assemble_context(&response.results, budget);
        Ok((context, response.stats))
    }

    /// Runs the same query vector-only and hybrid, side by side.
    ///
    /// The vector-only run bypasses fusion and reranking entirely: results
    /// are ordered by raw similarity. Useful for judging what the keyword
    /// path and the rerank stages contribute.
    pub async fn compare(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<ComparisonReport, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }

        let vector_query = VectorQuery::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.vector_store),
        );
        let vector_results = timeout(options.timeout, vector_query.search(query, options.limit))
            .await
            .map_err(|_| RetrievalError::RetrievalTimeout(options.timeout))??;

        let vector_only: Vec<SearchResult> = vector_results
            .into_iter()
            .map(|r| {
                SearchResult::from_candidate(RetrievalCandidate {
                    id: r.hit.id,
                    text: r.hit.text,
                    source: r.hit.source,
                    source_type: r.hit.source_type,
                    date: r.hit.date,
                    chunk_index: r.hit.chunk_index,
                    vector_score: r.score,
                    keyword_score: 0.0,
                    fused_score: r.score,
                })
            })
            .collect();

        let hybrid = self.search(query, options).await?.results;

        Ok(ComparisonReport {
            vector_only,
            hybrid,
        })
    }
}

/// Merges the two ranked lists into per-document candidates, keyed by id.
///
/// Vector results come first in their ranked order; keyword-only documents
/// are appended in keyword rank order, with metadata resolved from the
/// index snapshot. A path that missed a document leaves its score at
/// exactly 0.
fn merge_candidates(
    index: &Bm25Index,
    vector_results: Vec<VectorResult>,
    keyword_results: Vec<(String, f32)>,
) -> Vec<RetrievalCandidate> {
    let mut candidates: Vec<RetrievalCandidate> = Vec::new();
    let mut positions: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for result in vector_results {
        let hit = result.hit;
        positions.insert(hit.id.clone(), candidates.len());
        candidates.push(RetrievalCandidate {
            id: hit.id,
            text: hit.text,
            source: hit.source,
            source_type: hit.source_type,
            date: hit.date,
            chunk_index: hit.chunk_index,
            vector_score: result.score,
            keyword_score: 0.0,
            fused_score: 0.0,
        });
    }

    for (id, score) in keyword_results {
        if let Some(&pos) = positions.get(&id) {
            candidates[pos].keyword_score = score;
            continue;
        }
        let Some(doc) = index.get(&id) else {
            // The keyword list came from this same snapshot, so a miss here
            // would mean the snapshot changed underneath us.
            warn!(%id, "Keyword hit missing from index snapshot, dropping");
            continue;
        };
        positions.insert(id, candidates.len());
        candidates.push(RetrievalCandidate {
            id: doc.id.clone(),
            text: doc.text.clone(),
            source: doc.source.clone(),
            source_type: doc.source_type.clone(),
            date: doc.date,
            chunk_index: doc.chunk_index,
            vector_score: 0.0,
            keyword_score: score,
            fused_score: 0.0,
        });
    }

    candidates
}

/// Computes fused scores in place, then stable-sorts descending. The
/// stable sort keeps merge order (vector rank, then keyword rank) for
/// tied scores, so output order is deterministic.
fn fuse(candidates: &mut [RetrievalCandidate], options: &SearchOptions) {
    match options.fusion_method {
        FusionMethod::Rrf => {
            let vector_ranking: Vec<String> = candidates
                .iter()
                .filter(|c| c.vector_score > 0.0)
                .map(|c| c.id.clone())
                .collect();
            let mut keyword_ranked: Vec<(&String, f32)> = candidates
                .iter()
                .filter(|c| c.keyword_score > 0.0)
                .map(|c| (&c.id, c.keyword_score))
                .collect();
            keyword_ranked.sort_by(|a, b| {
                b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
            });
            let keyword_ranking: Vec<String> =
                keyword_ranked.into_iter().map(|(id, _)| id.clone()).collect();

            let fused = reciprocal_rank_fusion(&vector_ranking, &keyword_ranking, RRF_K);
            for candidate in candidates.iter_mut() {
                candidate.fused_score = fused.get(&candidate.id).copied().unwrap_or(0.0);
            }
        }
        FusionMethod::Weighted => {
            for candidate in candidates.iter_mut() {
                candidate.fused_score = weighted_fusion(
                    candidate.vector_score,
                    candidate.keyword_score,
                    options.vector_weight,
                    options.keyword_weight,
                );
            }
        }
        FusionMethod::Max => {
            for candidate in candidates.iter_mut() {
                candidate.fused_score =
                    max_fusion(candidate.vector_score, candidate.keyword_score);
            }
        }
    }

    candidates.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

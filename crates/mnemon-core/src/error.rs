//! Error types for mnemon-core.
//!
//! The retrieval taxonomy distinguishes partial-path failures (one of
//! vector/keyword down, recovered locally and surfaced as diagnostics)
//! from total failures (both paths down, corrupt index), which propagate
//! to the caller as errors.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during retrieval operations.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    /// Embedding provider unreachable or erroring. The keyword path is
    /// still attempted; a query degrades to keyword-only with a
    /// diagnostic flag rather than failing outright.
    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),
    /// Vector store unreachable. Same degraded-mode handling as
    /// [`RetrievalError::EmbeddingUnavailable`].
    #[error("Vector store unavailable: {0}")]
    VectorStoreUnavailable(String),
    /// Both retrieval paths failed. Fatal for the query.
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),
    /// Both retrieval paths exceeded their allotted time.
    #[error("Retrieval timed out after {0:?}")]
    RetrievalTimeout(Duration),
    /// A persisted BM25 snapshot failed structural validation. Callers
    /// should rebuild from the source corpus rather than operate on a
    /// partial index.
    #[error("Index snapshot corrupt: {0}")]
    IndexCorrupt(String),
    /// A document failed validation during index construction. Skipped
    /// and counted, never fatal to the overall build.
    #[error("Malformed document '{id}': {reason}")]
    MalformedDocument {
        /// Identifier of the offending document (may be empty)
        id: String,
        /// Why the document was rejected
        reason: String,
    },
    /// Invalid search query (empty text, zero result count).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// Snapshot persistence I/O error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl RetrievalError {
    /// Returns true if this error represents a single-path outage that
    /// the orchestrator can degrade around.
    pub fn is_path_failure(&self) -> bool {
        matches!(
            self,
            RetrievalError::EmbeddingUnavailable(_) | RetrievalError::VectorStoreUnavailable(_)
        )
    }
}

impl From<std::io::Error> for RetrievalError {
    fn from(e: std::io::Error) -> Self {
        RetrievalError::Storage(e.to_string())
    }
}

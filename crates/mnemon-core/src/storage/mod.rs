//! Persistence for BM25 index snapshots.
//!
//! A snapshot file is fully rebuilt on every reindex, never patched. Saves
//! go through a sibling temp file followed by an atomic rename, so a crash
//! mid-write can never leave a truncated snapshot where readers expect a
//! valid one.

use crate::error::RetrievalError;
use crate::search::bm25::{Bm25Index, BuildStats};
use crate::search::types::Document;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// File-backed store for a single BM25 index snapshot.
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    /// Creates a store over the given snapshot path. The file need not
    /// exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if a snapshot file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Persists an index snapshot atomically: serialize, write to a temp
    /// sibling, rename over the target.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn save(&self, index: &Bm25Index) -> Result<(), RetrievalError> {
        let blob = index.to_bytes()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &blob)?;
        fs::rename(&tmp, &self.path)?;

        info!(bytes = blob.len(), documents = index.len(), "Saved index snapshot");
        Ok(())
    }

    /// Loads the persisted snapshot.
    ///
    /// # Errors
    ///
    /// - [`RetrievalError::Storage`] if the file cannot be read
    /// - [`RetrievalError::IndexCorrupt`] if it fails structural
    ///   validation; callers should rebuild from the source corpus
    pub fn load(&self) -> Result<Bm25Index, RetrievalError> {
        let blob = fs::read(&self.path)?;
        Bm25Index::from_bytes(&blob)
    }

    /// Loads the snapshot, rebuilding from `documents` when it is missing
    /// or corrupt.
    ///
    /// The rebuild happens exactly once per corrupt-load detection and the
    /// fresh snapshot is persisted immediately, so the next load succeeds.
    /// Returns the index plus build stats when a rebuild occurred.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn load_or_rebuild(
        &self,
        documents: &[Document],
    ) -> Result<(Bm25Index, Option<BuildStats>), RetrievalError> {
        if self.exists() {
            match self.load() {
                Ok(index) => return Ok((index, None)),
                Err(RetrievalError::IndexCorrupt(reason)) => {
                    warn!(%reason, "Snapshot corrupt, rebuilding from source corpus");
                }
                Err(err) => return Err(err),
            }
        }

        let (index, stats) = Bm25Index::build(documents);
        self.save(&index)?;
        Ok((index, Some(stats)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

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

    fn sample_docs() -> Vec<Document> {
        vec![
            doc("d1", "the quick brown fox"),
            doc("d2", "a quick brown dog"),
            doc("d3", "deep learning neural networks"),
        ]
    }

    #[test]
    fn test_save_then_load_reproduces_scores() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index.json"));

        let (index, _) = Bm25Index::build(&sample_docs());
        store.save(&index).unwrap();
        let restored = store.load().unwrap();

        assert_eq!(restored.search("quick brown", 10), index.search("quick brown", 10));
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index.json"));

        let (first, _) = Bm25Index::build(&sample_docs());
        store.save(&first).unwrap();

        let (second, _) = Bm25Index::build(&[doc("only", "sourdough starter notes")]);
        store.save(&second).unwrap();

        let restored = store.load().unwrap();
        assert_eq!(restored.len(), 1);
        assert!(restored.search("quick", 10).is_empty());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("nested/deeper/index.json"));
        let (index, _) = Bm25Index::build(&sample_docs());
        store.save(&index).unwrap();
        assert!(store.exists());
    }

    #[test]
    fn test_load_missing_file_is_storage_error() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load(), Err(RetrievalError::Storage(_))));
    }

    #[test]
    fn test_load_or_rebuild_builds_when_missing() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index.json"));

        let (index, stats) = store.load_or_rebuild(&sample_docs()).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(stats.unwrap().indexed, 3);
        // The rebuilt snapshot was persisted.
        assert!(store.exists());
        assert!(store.load_or_rebuild(&sample_docs()).unwrap().1.is_none());
    }

    #[test]
    fn test_load_or_rebuild_recovers_from_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(&path, b"{ definitely not a snapshot").unwrap();

        let store = IndexStore::new(&path);
        assert!(matches!(store.load(), Err(RetrievalError::IndexCorrupt(_))));

        let (index, stats) = store.load_or_rebuild(&sample_docs()).unwrap();
        assert_eq!(index.len(), 3);
        assert!(stats.is_some());
        // The corrupt file was replaced with a valid snapshot.
        assert!(store.load().is_ok());
    }
}

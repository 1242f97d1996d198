//! Corpus loading and engine construction.
//!
//! The corpus is a JSON array of documents (id, text, source, source_type,
//! date, chunk_index). The CLI runs fully offline: the vector path uses the
//! deterministic hashing embedder over an in-memory store, and the keyword
//! path loads the persisted BM25 snapshot, rebuilding it from the corpus
//! when it is missing or corrupt.

use anyhow::{anyhow, Context, Result};
use mnemon_core::search::{Document, HashingEmbedder, HybridSearchEngine, InMemoryVectorStore};
use mnemon_core::storage::IndexStore;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Engine type the CLI operates: hashing embedder over an in-memory store.
pub type CliEngine = HybridSearchEngine<HashingEmbedder, InMemoryVectorStore>;

/// Loads the corpus file.
pub fn load_corpus(path: &Path) -> Result<Vec<Document>> {
    if !path.exists() {
        return Err(anyhow!(
            "No corpus found at {}.\n\
             Create a JSON array of documents there first.",
            path.display()
        ));
    }
    let blob = std::fs::read(path)
        .with_context(|| format!("Failed to read corpus: {}", path.display()))?;
    let documents: Vec<Document> = serde_json::from_slice(&blob)
        .with_context(|| format!("Failed to parse corpus: {}", path.display()))?;
    info!(documents = documents.len(), "Loaded corpus");
    Ok(documents)
}

/// Builds the engine: populates the vector store from the corpus and
/// loads (or rebuilds) the persisted keyword index.
pub fn build_engine(documents: &[Document], index_path: &Path) -> Result<CliEngine> {
    let embedder = Arc::new(HashingEmbedder::default());
    let store = Arc::new(InMemoryVectorStore::new());
    for doc in documents {
        store.add(
            &doc.id,
            &doc.text,
            &doc.source,
            &doc.source_type,
            doc.date,
            doc.chunk_index,
            embedder.embed_sync(&doc.text),
        );
    }

    let index_store = IndexStore::new(index_path);
    let (index, rebuilt) = index_store
        .load_or_rebuild(documents)
        .with_context(|| format!("Failed to load index: {}", index_path.display()))?;
    if let Some(stats) = rebuilt {
        info!(
            indexed = stats.indexed,
            skipped = stats.skipped,
            "Rebuilt keyword index snapshot"
        );
    }

    Ok(HybridSearchEngine::with_index(embedder, store, index))
}

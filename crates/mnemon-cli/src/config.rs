//! Configuration and path resolution for the CLI.
//!
//! All state lives under a single data directory holding the source
//! corpus and the persisted index snapshot. Resolution order:
//!
//! 1. `--data-dir` flag
//! 2. `$MNEMON_DATA_DIR` environment variable
//! 3. `.mnemon/` in the current working directory

use std::path::{Path, PathBuf};

/// Corpus file name inside the data directory.
const CORPUS_FILENAME: &str = "corpus.json";

/// Index snapshot file name inside the data directory.
const INDEX_FILENAME: &str = "index.json";

/// Environment variable for a custom data directory.
const DATA_DIR_ENV: &str = "MNEMON_DATA_DIR";

/// Resolves the data directory.
pub fn data_dir(flag: Option<&PathBuf>) -> PathBuf {
    if let Some(dir) = flag {
        return dir.clone();
    }
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    PathBuf::from(".mnemon")
}

/// Path of the source corpus file.
pub fn corpus_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CORPUS_FILENAME)
}

/// Path of the persisted index snapshot.
pub fn index_path(data_dir: &Path) -> PathBuf {
    data_dir.join(INDEX_FILENAME)
}

//! Directory loading with per-document error isolation

use super::document::AnnotationDocument;
use super::ingestor::Ingestor;
use crate::storage::{GraphStore, StorageError, StorageResult};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Per-call cap for bulk deletes; `clear_store` loops until the store
/// reports empty
const DELETE_BATCH: usize = 50_000;

/// Errors that can occur while loading a document directory
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Clear the store before loading
    pub clear_first: bool,
}

/// What a load run accomplished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Documents ingested successfully
    pub loaded: usize,
    /// Documents rejected by the backend and skipped
    pub rejected: usize,
    /// Nodes removed by the pre-load clear
    pub cleared_nodes: u64,
}

/// Delete every node in the store.
///
/// Each delete call is bounded, so this loops until the store reports zero
/// deletions; a single call is not sufficient for large graphs.
pub fn clear_store<S: GraphStore>(store: &S) -> StorageResult<u64> {
    let mut total = 0;
    loop {
        let deleted = store.delete_batch(DELETE_BATCH)?;
        if deleted == 0 {
            return Ok(total);
        }
        total += deleted;
    }
}

/// Enumerate `*.json` files directly under `dir` (sorted by path) and
/// ingest each as one document.
///
/// A document the backend rejects is logged as a warning and skipped; the
/// run continues. A document that fails to parse aborts the load.
pub fn load_directory<S: GraphStore>(
    store: &S,
    dir: &Path,
    options: &LoadOptions,
) -> Result<LoadSummary, LoadError> {
    let mut summary = LoadSummary::default();

    if options.clear_first {
        summary.cleared_nodes = clear_store(store)?;
        info!(deleted = summary.cleared_nodes, "cleared store");
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "json")
        {
            paths.push(entry.path().to_path_buf());
        }
    }
    paths.sort();

    let ingestor = Ingestor::new(store);
    for path in &paths {
        info!(path = %path.display(), "loading document");
        let file = File::open(path)?;
        let doc: AnnotationDocument = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| LoadError::Parse { path: path.clone(), source })?;

        match ingestor.ingest(&doc) {
            Ok(_) => summary.loaded += 1,
            Err(StorageError::Rejected(reason)) => {
                warn!(path = %path.display(), %reason, "document rejected, skipping");
                summary.rejected += 1;
            }
            Err(other) => return Err(other.into()),
        }
    }

    info!(loaded = summary.loaded, rejected = summary.rejected, "load complete");
    Ok(summary)
}

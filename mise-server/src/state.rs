use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use mise_core::storage::{load_store, MANIFEST_FILE};
use mise_core::EmbeddingStore;

use crate::error::ServerResult;

/// Shared state handed to every request handler.
///
/// The store is loaded once at startup and never mutated afterwards, so
/// handlers share it through an `Arc` without locking.
#[derive(Clone, Debug)]
pub struct AppState {
    pub data_path: PathBuf,
    pub store: Arc<EmbeddingStore>,
}

impl AppState {
    pub fn new(data_path: PathBuf, store: EmbeddingStore) -> Self {
        AppState { data_path, store: Arc::new(store) }
    }

    /// Loads the corpus listed in `data_path/spaces.json`. A directory without
    /// a manifest yields an empty store.
    pub fn load(data_path: &Path) -> ServerResult<Self> {
        if !data_path.join(MANIFEST_FILE).exists() {
            warn!(path = ?data_path, "No {} found, starting with an empty store", MANIFEST_FILE);
            return Ok(AppState::new(data_path.to_path_buf(), EmbeddingStore::new()));
        }
        let store = load_store(data_path)?;
        info!(
            path = ?data_path,
            spaces = store.describe().len(),
            items = store.row_count(),
            "Embedding store loaded"
        );
        Ok(AppState::new(data_path.to_path_buf(), store))
    }
}

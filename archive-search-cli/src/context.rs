use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use archive_search::{ArchiveConfig, MemoryEngine, MemoryStore, SearchService, TimeoutEngine};

/// A loaded snapshot and the service built over it.
pub struct Context {
    pub config: ArchiveConfig,
    pub store: Arc<MemoryStore>,
    pub service: SearchService,
}

/// Read the configuration file, or fall back to defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<ArchiveConfig> {
    let Some(path) = path else {
        return Ok(ArchiveConfig::default());
    };
    ArchiveConfig::load(path).with_context(|| format!("Failed to read config {}", path.display()))
}

/// Load the snapshot and wire a service over a fresh in-memory engine.
///
/// The engine starts empty; call [`open_indexed`] to search right away.
pub fn open(config_path: Option<&Path>, store_path: &Path) -> Result<Context> {
    if !store_path.exists() {
        bail!("No snapshot found at {}.", store_path.display());
    }
    let config = load_config(config_path)?;
    let store = Arc::new(
        MemoryStore::load(store_path)
            .with_context(|| format!("Failed to load snapshot {}", store_path.display()))?,
    );

    let engine = Arc::new(TimeoutEngine::new(
        Arc::new(MemoryEngine::new()),
        config.engine.timeout(),
    ));
    let service = SearchService::new(engine, store.clone(), config.clone());

    Ok(Context {
        config,
        store,
        service,
    })
}

/// [`open`], then build every index from the snapshot.
pub fn open_indexed(config_path: Option<&Path>, store_path: &Path) -> Result<Context> {
    let context = open(config_path, store_path)?;
    let reports = context
        .service
        .rebuild_all()
        .context("Failed to index the snapshot")?;
    tracing::debug!("Indexed snapshot into {} generations", reports.len());
    Ok(context)
}

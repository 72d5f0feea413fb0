use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};

/// Top-level configuration, loadable from TOML.
///
/// ```toml
/// [search]
/// page_size = 25
///
/// [engine]
/// timeout_ms = 10000
///
/// [index]
/// prefix = "fv"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub index: IndexSettings,
}

impl ArchiveConfig {
    pub fn builder() -> ArchiveConfigBuilder {
        ArchiveConfigBuilder::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ArchiveConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.search.page_size == 0 {
            return Err(ArchiveError::config("search.page_size must be positive"));
        }
        if self.search.max_page_size < self.search.page_size {
            return Err(ArchiveError::config(
                "search.max_page_size must not be smaller than search.page_size",
            ));
        }
        if self.index.bulk_chunk_size == 0 {
            return Err(ArchiveError::config("index.bulk_chunk_size must be positive"));
        }
        Ok(())
    }
}

/// Query compilation and paging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Page size used when the request does not supply a valid one.
    pub page_size: usize,
    /// Upper bound for a requested page size.
    pub max_page_size: usize,
    /// Deepest result window the engine will be asked for.
    pub max_results: usize,
    /// Word-count filters are clamped to this value.
    pub length_filter_max: u32,
    /// Terms this long or longer skip the fuzzy tiers.
    pub fuzzy_search_cutoff: usize,
    /// Maximum edit distance for fuzzy tiers.
    pub fuzziness: u32,
    /// How far apart phrase terms may be.
    pub phrase_slop: u32,
    /// Random-sort seeds stay stable for identical requests within this window.
    pub random_seed_window_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            page_size: 25,
            max_page_size: 10_000,
            max_results: 10_000,
            length_filter_max: 10,
            fuzzy_search_cutoff: 30,
            fuzziness: 2,
            phrase_slop: 3,
            random_seed_window_secs: 300,
        }
    }
}

/// Settings for calls against the search engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Per-call timeout; exhaustion counts as a connectivity failure.
    pub timeout_ms: u64,
    pub shards: u32,
    pub replicas: u32,
}

impl EngineSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            timeout_ms: 10_000,
            shards: 1,
            replicas: 0,
        }
    }
}

/// Index lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Prepended to every alias name, e.g. `fv_songs`.
    pub prefix: String,
    /// Documents sent per bulk request while rebuilding.
    pub bulk_chunk_size: usize,
    /// How many superseded generations are kept after a cutover.
    pub retain_generations: usize,
    /// How long a rebuild waits for another rebuild of the same alias.
    pub rebuild_lease_timeout_ms: u64,
}

impl IndexSettings {
    pub fn rebuild_lease_timeout(&self) -> Duration {
        Duration::from_millis(self.rebuild_lease_timeout_ms)
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        IndexSettings {
            prefix: String::new(),
            bulk_chunk_size: 500,
            retain_generations: 0,
            rebuild_lease_timeout_ms: 0,
        }
    }
}

#[derive(Default)]
pub struct ArchiveConfigBuilder {
    config: ArchiveConfig,
}

impl ArchiveConfigBuilder {
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.search.page_size = page_size;
        self
    }

    pub fn max_page_size(mut self, max_page_size: usize) -> Self {
        self.config.search.max_page_size = max_page_size;
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.config.search.max_results = max_results;
        self
    }

    pub fn fuzzy_search_cutoff(mut self, cutoff: usize) -> Self {
        self.config.search.fuzzy_search_cutoff = cutoff;
        self
    }

    pub fn random_seed_window_secs(mut self, secs: u64) -> Self {
        self.config.search.random_seed_window_secs = secs;
        self
    }

    pub fn engine_timeout(mut self, timeout: Duration) -> Self {
        self.config.engine.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn index_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.index.prefix = prefix.into();
        self
    }

    pub fn bulk_chunk_size(mut self, size: usize) -> Self {
        self.config.index.bulk_chunk_size = size;
        self
    }

    pub fn retain_generations(mut self, count: usize) -> Self {
        self.config.index.retain_generations = count;
        self
    }

    pub fn rebuild_lease_timeout(mut self, timeout: Duration) -> Self {
        self.config.index.rebuild_lease_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn build(self) -> ArchiveConfig {
        self.config
    }
}

use serde::{Deserialize, Serialize};

use super::defaults;

/// Path analysis bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Maximum edges in a reconstructed path.
    pub max_depth: usize,
    /// Maximum distinct paths kept per result.
    pub max_paths_per_result: usize,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            max_depth: defaults::DEFAULT_MAX_PATH_DEPTH,
            max_paths_per_result: defaults::DEFAULT_MAX_PATHS_PER_RESULT,
        }
    }
}

/// Process-level knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Size of the bounded worker pool used at the parallel points.
    pub worker_threads: usize,
    /// Entries held by the cross-query embedding cache.
    pub embedding_cache_size: u64,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: defaults::DEFAULT_WORKER_THREADS,
            embedding_cache_size: defaults::DEFAULT_EMBEDDING_CACHE_SIZE,
            log_level: defaults::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Vertices handed to one rayon task in label propagation.
pub(crate) const DEFAULT_CHUNK_SIZE: usize = 2048;

pub(crate) const READ_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Which splitter to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SplitAlgorithm {
    /// Label propagation.
    Lpa,
    /// Depth-first, communities statically owned by workers.
    Dfs,
    /// Breadth-first, communities claimed dynamically.
    Bfs,
}

/// Run on the calling thread, or on a worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

/// Runtime options of a split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub algorithm: SplitAlgorithm,
    pub mode: ExecutionMode,
    /// Only rescan vertices whose neighbors changed (label propagation only).
    pub pruning: bool,
    /// Worker count, 0 means one per core.
    pub workers: usize,
    pub chunk_size: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            algorithm: SplitAlgorithm::Bfs,
            mode: ExecutionMode::Parallel,
            pruning: true,
            workers: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SplitConfig {
    /// Load the config from a YAML file, missing fields take their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// The worker count actually used.
    pub fn effective_workers(&self) -> usize {
        resolve_workers(self.workers)
    }
}

pub(crate) fn resolve_workers(workers: usize) -> usize {
    if workers == 0 {
        num_cpus::get().max(1)
    } else {
        workers
    }
}

//! Batch-size configuration for the import driver.

use std::env;

pub const DEFAULT_BATCH_SIZE: usize = 10_000;
const BATCH_SIZE_ENV_VAR: &str = "BRANCHQL_BATCH_SIZE";

/// Controls how the driver partitions a resolved id list. `Size(n)` chunks
/// into groups of `n`; `Disabled` runs every id in a single batch (the
/// DSL's `:batch false`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchConfig {
    Size(usize),
    Disabled,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig::Size(DEFAULT_BATCH_SIZE)
    }
}

impl BatchConfig {
    /// Reads `BRANCHQL_BATCH_SIZE` if set and parseable, falling back to
    /// [`DEFAULT_BATCH_SIZE`] otherwise. `0` is treated as `Disabled`.
    pub fn from_env() -> Self {
        match env::var(BATCH_SIZE_ENV_VAR) {
            Ok(value) => match value.parse::<usize>() {
                Ok(0) => BatchConfig::Disabled,
                Ok(n) => BatchConfig::Size(n),
                Err(_) => BatchConfig::default(),
            },
            Err(_) => BatchConfig::default(),
        }
    }

    /// Splits `ids` into batches per this config, as a single batch when
    /// disabled or when `ids` is already small enough.
    pub fn partition<T: Clone>(&self, ids: &[T]) -> Vec<Vec<T>> {
        match self {
            BatchConfig::Disabled => {
                if ids.is_empty() {
                    Vec::new()
                } else {
                    vec![ids.to_vec()]
                }
            }
            BatchConfig::Size(n) => ids.chunks((*n).max(1)).map(|chunk| chunk.to_vec()).collect(),
        }
    }
}

use serde::{Deserialize, Serialize};

/// Batch processing configuration for the write pipeline.
///
/// A chunk is flushed to the batch writer when it reaches [`BatchConfig::max_size`]
/// commands, or when [`BatchConfig::max_fill_ms`] elapses since the first command
/// joined the open chunk, whichever happens first.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchConfig {
    /// Maximum number of commands accumulated in a single chunk.
    pub max_size: usize,
    /// Maximum time, in milliseconds, to wait for a chunk to fill before flushing it.
    pub max_fill_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            max_fill_ms: 50,
        }
    }
}

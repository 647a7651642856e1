use serde::{Deserialize, Serialize};

use crate::shared::{BatchConfig, QueueConfig, RetryConfig, ValidationError};

/// Configuration for a write pipeline.
///
/// Contains all settings required to run a sink pipeline: queueing, batching
/// and the retry policy of the batch writer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// The unique identifier for this pipeline.
    pub id: u64,
    /// Bounded command queue configuration.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Batch processing configuration.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Retry policy for failed chunk transactions.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl PipelineConfig {
    /// Validates pipeline configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.queue.capacity == 0 {
            return Err(ValidationError::QueueCapacityZero);
        }

        if self.batch.max_size == 0 {
            return Err(ValidationError::BatchMaxSizeZero);
        }

        Ok(())
    }
}

use serde::{Deserialize, Serialize};

use crate::shared::{DestinationConfig, PipelineConfig, ValidationError};

/// Complete configuration for the transmitter service.
///
/// Aggregates all configuration required to run a transmitter: the destination
/// the records are written to and the pipeline that batches them. Typically
/// loaded from configuration files at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TransmitterConfig {
    /// Configuration for the write destination.
    pub destination: DestinationConfig,
    /// Configuration for the write pipeline.
    pub pipeline: PipelineConfig,
}

impl TransmitterConfig {
    /// Validates the complete transmitter configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.destination.validate()?;
        self.pipeline.validate()
    }
}

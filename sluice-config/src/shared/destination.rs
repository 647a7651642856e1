use serde::{Deserialize, Serialize};

use crate::shared::{PgConnectionConfig, PgPoolConfig, ValidationError};

/// Configuration options for supported write destinations.
///
/// This enum selects the destination type the transmitter writes to, together
/// with its connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationConfig {
    /// In-memory destination for ephemeral or test data.
    Memory,
    /// Postgres destination configuration.
    Postgres {
        /// Connection settings for the destination database.
        connection: PgConnectionConfig,
        /// Connection pool settings.
        #[serde(default)]
        pool: PgPoolConfig,
    },
}

impl DestinationConfig {
    /// Validates the destination configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Memory => Ok(()),
            Self::Postgres { connection, pool } => {
                connection.tls.validate()?;

                if pool.max_connections == 0 {
                    return Err(ValidationError::MaxConnectionsZero);
                }

                Ok(())
            }
        }
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self::Memory
    }
}

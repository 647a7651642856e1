use serde::{Deserialize, Serialize};

/// Connection pool configuration for the destination database.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PgPoolConfig {
    /// Maximum number of open connections in the pool.
    pub max_connections: u32,
}

impl Default for PgPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
        }
    }
}

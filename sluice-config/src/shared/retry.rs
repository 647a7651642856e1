use serde::{Deserialize, Serialize};

/// Retry policy for failed chunk transactions.
///
/// The batch writer retries a failed chunk indefinitely with a fixed delay
/// between attempts. There is no backoff and no attempt limit: the write path
/// stalls rather than drop data.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Delay, in milliseconds, between one chunk write attempt and the next.
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { delay_ms: 5_000 }
    }
}

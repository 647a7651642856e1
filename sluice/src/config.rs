//! Configuration objects for sink pipelines.
//!
//! Re-exports configuration types and utilities required for pipeline setup and operation.

// Re-exports.
pub use sluice_config::shared::*;

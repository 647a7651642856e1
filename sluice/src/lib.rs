pub mod completion;
pub mod concurrency;
pub mod config;
pub mod destination;
pub mod error;
mod macros;
pub mod pipeline;
pub mod queue;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod translator;
pub mod types;
pub mod writer;

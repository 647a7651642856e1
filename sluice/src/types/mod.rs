mod command;
mod record;
mod value;

pub use command::*;
pub use record::*;
pub use value::*;

/// Unique identifier of a sink pipeline.
pub type PipelineId = u64;

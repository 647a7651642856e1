use std::collections::HashMap;

use crate::types::record::Record;
use crate::types::value::SqlValue;

/// One queued, fully-bound SQL statement derived from a [`Record`].
///
/// A [`Command`] carries the templated statement with named placeholders, the
/// values to bind, the source record (retained for logging and the completion
/// callback) and the caller's opaque correlation token `R`, which is handed
/// back once the command's chunk durably commits.
#[derive(Debug, Clone, PartialEq)]
pub struct Command<R> {
    /// Opaque caller correlation token, returned through the completion handler.
    pub reference: R,
    /// The source record the statement was derived from.
    pub record: Record,
    /// Templated SQL with named `:binding` placeholders.
    pub query: String,
    /// Values to bind, keyed by binding name.
    pub args: HashMap<String, SqlValue>,
}

/// An ordered batch of commands executed together in one transaction.
///
/// A chunk exists only transiently between a batcher flush and transaction
/// completion, and is owned exclusively by the batch writer during execution.
pub type Chunk<R> = Vec<Command<R>>;

//! Per-command completion notification.
//!
//! The embedding application supplies a [`CompletionHandler`] at pipeline
//! construction time; the batch writer invokes it once per command, in chunk
//! order, only after the command's chunk has durably committed.

use crate::types::Record;

/// Strategy invoked once per command after its chunk commits.
///
/// Implementations receive back the opaque reference supplied alongside the
/// record and the record itself, and typically acknowledge the original
/// upstream event. The handler is called synchronously from the batch writer
/// loop, so it should not block for long.
pub trait CompletionHandler<R>: Send + Sync {
    fn command_completed(&self, reference: R, record: Record);
}

/// A completion handler that does nothing.
///
/// This is the default wired into pipelines whose embedding application does
/// not need completion notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompletion;

impl<R> CompletionHandler<R> for NoopCompletion {
    fn command_completed(&self, _reference: R, _record: Record) {}
}

/// Any `Fn(R, Record)` closure can act as a completion handler.
impl<R, F> CompletionHandler<R> for F
where
    F: Fn(R, Record) + Send + Sync,
{
    fn command_completed(&self, reference: R, record: Record) {
        self(reference, record)
    }
}

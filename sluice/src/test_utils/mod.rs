//! Test helpers for exercising the write pipeline without a real database.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::completion::CompletionHandler;
use crate::destination::base::ChunkDestination;
use crate::error::{ErrorKind, SluiceError, SluiceResult};
use crate::sluice_error;
use crate::types::{Command, Record};

/// A completion handler that records every completed command.
///
/// Completions are stored in invocation order, so tests can assert both the
/// set and the ordering of acknowledgments.
#[derive(Debug)]
pub struct CollectingCompletion<R> {
    completed: Arc<Mutex<Vec<(R, Record)>>>,
}

impl<R> Clone for CollectingCompletion<R> {
    fn clone(&self) -> Self {
        Self {
            completed: self.completed.clone(),
        }
    }
}

impl<R> CollectingCompletion<R> {
    pub fn new() -> Self {
        Self {
            completed: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<R: Clone> CollectingCompletion<R> {
    /// Returns every completion recorded so far, in invocation order.
    pub fn completed(&self) -> Vec<(R, Record)> {
        self.completed.lock().unwrap().clone()
    }
}

impl<R> Default for CollectingCompletion<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Send> CompletionHandler<R> for CollectingCompletion<R> {
    fn command_completed(&self, reference: R, record: Record) {
        self.completed.lock().unwrap().push((reference, record));
    }
}

/// A destination wrapper that fails a configured number of chunk applications.
///
/// The first `failures` calls to `apply_chunk` return an injected error before
/// reaching the wrapped destination; subsequent calls pass through. Attempts
/// are counted across both outcomes, so tests can observe retry behavior.
#[derive(Debug)]
pub struct FaultInjectingDestination<D> {
    inner: D,
    failures_remaining: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl<D: Clone> Clone for FaultInjectingDestination<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            failures_remaining: self.failures_remaining.clone(),
            attempts: self.attempts.clone(),
        }
    }
}

impl<D> FaultInjectingDestination<D> {
    /// Wraps a destination, failing the first `failures` chunk applications.
    pub fn failing(inner: D, failures: usize) -> Self {
        Self {
            inner,
            failures_remaining: Arc::new(AtomicUsize::new(failures)),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns how many chunk applications have been attempted so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl<R, D> ChunkDestination<R> for FaultInjectingDestination<D>
where
    R: Send + Sync,
    D: ChunkDestination<R> + Sync,
{
    async fn apply_chunk(&self, chunk: &[Command<R>]) -> SluiceResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(sluice_error!(
                ErrorKind::DestinationQueryFailed,
                "Injected chunk application failure"
            ));
        }

        self.inner.apply_chunk(chunk).await
    }
}

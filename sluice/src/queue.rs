//! Bounded command hand-off between producers and the batcher.
//!
//! The queue is the sole structure shared between producer contexts and the
//! single consumer loop. It is backed by a bounded channel: when full,
//! [`CommandQueue::enqueue`] suspends the producer instead of dropping the
//! command, which propagates backpressure all the way to the record source.

use core::pin::Pin;
use core::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::error::{ErrorKind, SluiceError, SluiceResult};
use crate::sluice_error;
use crate::types::Command;

/// Creates a bounded queue with the given capacity.
///
/// Returns the producer handle and the consumer stream. The producer handle is
/// cheaply cloneable so any number of producers can enqueue concurrently;
/// ordering across producers is first-come-first-served at the channel.
///
/// # Panics
/// Panics if `capacity` is zero. Configuration validation rejects a zero
/// capacity before a pipeline is built.
pub fn bounded<R>(capacity: usize) -> (CommandQueue<R>, CommandStream<R>) {
    let (tx, rx) = mpsc::channel(capacity);
    (CommandQueue { tx }, CommandStream { rx })
}

/// Producer handle of the bounded command queue.
#[derive(Debug)]
pub struct CommandQueue<R> {
    tx: mpsc::Sender<Command<R>>,
}

impl<R> Clone for CommandQueue<R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<R> CommandQueue<R> {
    /// Enqueues a command, suspending while the queue is full.
    ///
    /// Commands are never dropped: the call only returns an error when the
    /// consumer side has been dropped, meaning the pipeline is gone and the
    /// command can no longer be delivered.
    pub async fn enqueue(&self, command: Command<R>) -> SluiceResult<()> {
        self.tx.send(command).await.map_err(|_| {
            sluice_error!(
                ErrorKind::QueueClosed,
                "Command queue closed, the pipeline consumer is gone"
            )
        })
    }
}

/// Consumer side of the bounded command queue, exposed as a [`Stream`].
///
/// There is exactly one consumer: the pipeline's batcher loop, which wraps the
/// stream into a batching adapter.
#[derive(Debug)]
pub struct CommandStream<R> {
    rx: mpsc::Receiver<Command<R>>,
}

impl<R> Stream for CommandStream<R> {
    type Item = Command<R>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Method, Record};
    use futures::{FutureExt, StreamExt};
    use std::collections::HashMap;

    fn command(reference: u64) -> Command<u64> {
        Command {
            reference,
            record: Record::new(Method::Insert, "users", vec![], None),
            query: String::new(),
            args: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn commands_are_delivered_in_enqueue_order() {
        let (queue, mut stream) = bounded(8);

        for reference in 0..4u64 {
            queue.enqueue(command(reference)).await.unwrap();
        }

        for reference in 0..4u64 {
            let received = stream.next().await.unwrap();
            assert_eq!(received.reference, reference);
        }
    }

    #[tokio::test]
    async fn enqueue_blocks_when_the_queue_is_full() {
        let (queue, mut stream) = bounded(1);

        queue.enqueue(command(0)).await.unwrap();

        // The queue is full, so the next enqueue must not complete yet.
        let mut blocked = Box::pin(queue.enqueue(command(1)));
        assert!(blocked.as_mut().now_or_never().is_none());

        // Draining one command frees a slot and unblocks the producer.
        assert_eq!(stream.next().await.unwrap().reference, 0);
        blocked.await.unwrap();
        assert_eq!(stream.next().await.unwrap().reference, 1);
    }

    #[tokio::test]
    async fn enqueue_fails_once_the_consumer_is_gone() {
        let (queue, stream) = bounded::<u64>(1);
        drop(stream);

        let err = queue.enqueue(command(0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueueClosed);
    }
}

use core::pin::Pin;
use core::task::{Context, Poll};
use std::time::Duration;

use futures::{Future, Stream, ready};
use pin_project_lite::pin_project;
use sluice_config::shared::BatchConfig;
use tracing::info;

use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};

pin_project! {
    /// A stream adapter that groups items into batches by size and idle time.
    ///
    /// At most one batch is open at a time. The open batch is emitted when it
    /// reaches the configured maximum size, or when the configured timeout
    /// elapses after its first item arrived, whichever happens first. When the
    /// shutdown signal fires, whatever is accumulated is emitted with a
    /// shutdown marker and the stream terminates.
    #[must_use = "streams do nothing unless polled"]
    #[derive(Debug)]
    pub struct BatchStream<B, S: Stream<Item = B>> {
        #[pin]
        stream: S,
        #[pin]
        deadline: Option<tokio::time::Sleep>,
        shutdown_rx: ShutdownRx,
        items: Vec<S::Item>,
        batch_config: BatchConfig,
        reset_timer: bool,
        inner_stream_ended: bool,
        stream_stopped: bool,
    }
}

impl<B, S: Stream<Item = B>> BatchStream<B, S> {
    /// Wraps a stream into a [`BatchStream`] with the given configuration.
    pub fn wrap(stream: S, batch_config: BatchConfig, shutdown_rx: ShutdownRx) -> Self {
        BatchStream {
            stream,
            deadline: None,
            shutdown_rx,
            items: Vec::with_capacity(batch_config.max_size),
            batch_config,
            reset_timer: true,
            inner_stream_ended: false,
            stream_stopped: false,
        }
    }
}

impl<B, S: Stream<Item = B>> Stream for BatchStream<B, S> {
    type Item = ShutdownResult<Vec<S::Item>, Vec<S::Item>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.as_mut().project();

        if *this.inner_stream_ended {
            return Poll::Ready(None);
        }

        loop {
            if *this.stream_stopped {
                return Poll::Ready(None);
            }

            // Shutdown takes priority over everything else. Accumulated items
            // are handed back so the consumer can still flush them; even an
            // empty batch is returned to signal that shutdown occurred.
            if this.shutdown_rx.has_changed().unwrap_or(false) {
                info!("the batch stream has been stopped");

                *this.stream_stopped = true;
                this.shutdown_rx.mark_unchanged();

                return Poll::Ready(Some(ShutdownResult::Shutdown(std::mem::take(this.items))));
            }

            // The timer restarts whenever a new batch begins filling.
            if *this.reset_timer {
                this.deadline
                    .set(Some(tokio::time::sleep(Duration::from_millis(
                        this.batch_config.max_fill_ms,
                    ))));
                *this.reset_timer = false;
            }

            if this.items.is_empty() {
                this.items.reserve_exact(this.batch_config.max_size);
            }

            match this.stream.as_mut().poll_next(cx) {
                Poll::Pending => break,
                Poll::Ready(Some(item)) => {
                    this.items.push(item);

                    // Size threshold reached, emit immediately.
                    if this.items.len() >= this.batch_config.max_size {
                        *this.reset_timer = true;

                        return Poll::Ready(Some(ShutdownResult::Ok(std::mem::take(this.items))));
                    }
                }
                Poll::Ready(None) => {
                    // The inner stream finished; emit the final partial batch
                    // if there is one.
                    let last = if this.items.is_empty() {
                        None
                    } else {
                        *this.reset_timer = true;
                        Some(ShutdownResult::Ok(std::mem::take(this.items)))
                    };

                    *this.inner_stream_ended = true;

                    return Poll::Ready(last);
                }
            }
        }

        // No more items available right now; emit the open batch if its idle
        // timeout has elapsed.
        if !this.items.is_empty()
            && let Some(deadline) = this.deadline.as_pin_mut()
        {
            ready!(deadline.poll(cx));
            *this.reset_timer = true;

            return Poll::Ready(Some(ShutdownResult::Ok(std::mem::take(this.items))));
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::shutdown::create_shutdown_channel;
    use futures::StreamExt;
    use tokio::sync::mpsc;

    /// Minimal stream over a tokio mpsc receiver, for driving the adapter.
    struct ReceiverStream<T>(mpsc::Receiver<T>);

    impl<T> Stream for ReceiverStream<T> {
        type Item = T;

        fn poll_next(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<Option<Self::Item>> {
            self.0.poll_recv(cx)
        }
    }

    fn batch_config(max_size: usize, max_fill_ms: u64) -> BatchConfig {
        BatchConfig {
            max_size,
            max_fill_ms,
        }
    }

    fn items_of(result: ShutdownResult<Vec<u32>, Vec<u32>>) -> Vec<u32> {
        match result {
            ShutdownResult::Ok(items) | ShutdownResult::Shutdown(items) => items,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn emits_full_batches_by_size() {
        let (tx, rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let mut stream = Box::pin(BatchStream::wrap(
            ReceiverStream(rx),
            batch_config(2, 60_000),
            shutdown_rx,
        ));

        for item in 0..4u32 {
            tx.send(item).await.unwrap();
        }

        let first = stream.next().await.unwrap();
        assert!(!first.should_shutdown());
        assert_eq!(items_of(first), vec![0, 1]);

        let second = stream.next().await.unwrap();
        assert_eq!(items_of(second), vec![2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn emits_partial_batch_on_idle_timeout() {
        let (tx, rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let mut stream = Box::pin(BatchStream::wrap(
            ReceiverStream(rx),
            batch_config(100, 50),
            shutdown_rx,
        ));

        tx.send(1u32).await.unwrap();

        // The batch is nowhere near full, so only the idle timeout can emit it.
        let batch = stream.next().await.unwrap();
        assert_eq!(items_of(batch), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_returns_accumulated_items() {
        let (tx, rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let mut stream = Box::pin(BatchStream::wrap(
            ReceiverStream(rx),
            batch_config(100, 60_000),
            shutdown_rx,
        ));

        tx.send(1u32).await.unwrap();
        tx.send(2u32).await.unwrap();

        let handle = tokio::spawn(async move {
            let batch = stream.next().await.unwrap();
            assert!(batch.should_shutdown());
            assert_eq!(items_of(batch), vec![1, 2]);

            assert!(stream.next().await.is_none());
        });

        // Give the consumer a chance to accumulate both items before the
        // shutdown signal fires.
        tokio::time::sleep(Duration::from_millis(1)).await;
        shutdown_tx.shutdown().unwrap();

        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stream_end_flushes_the_open_batch() {
        let (tx, rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let mut stream = Box::pin(BatchStream::wrap(
            ReceiverStream(rx),
            batch_config(100, 60_000),
            shutdown_rx,
        ));

        tx.send(7u32).await.unwrap();
        drop(tx);

        let batch = stream.next().await.unwrap();
        assert_eq!(items_of(batch), vec![7]);
        assert!(stream.next().await.is_none());
    }
}

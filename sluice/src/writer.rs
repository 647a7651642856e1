//! Transactional batch writing with retry-until-success.
//!
//! The [`BatchWriter`] executes one chunk at a time against a
//! [`ChunkDestination`], retrying a failed chunk indefinitely with a fixed
//! delay. Completion notifications fire only after the chunk as a whole has
//! committed, once per command, in chunk order.

use std::time::Duration;

use tracing::{debug, warn};

use crate::completion::CompletionHandler;
use crate::destination::base::ChunkDestination;
use crate::types::Chunk;

/// States of a single chunk write.
///
/// A write starts in `Executing` and only ever terminates in `Committed`;
/// every failure routes through `Retrying` back to `Executing`. Rollback is
/// part of the destination's atomicity contract, so a failed attempt leaves
/// the database as if it never ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkWriteState {
    /// An attempt to apply the chunk is in flight.
    Executing,
    /// The last attempt failed; waiting out the retry delay.
    Retrying,
    /// The chunk has durably committed.
    Committed,
}

/// Writes chunks to a destination, one at a time, until each commits.
///
/// The writer never runs two chunks concurrently: the pipeline's consumer loop
/// owns it and awaits every [`BatchWriter::write_chunk`] call before taking
/// the next chunk. Delivery is at-least-once; a chunk whose commit succeeded
/// but whose completion handling was cut short by a crash will be redelivered
/// by the upstream producer.
#[derive(Debug)]
pub struct BatchWriter<D, C> {
    destination: D,
    completion: C,
    retry_delay: Duration,
}

impl<D, C> BatchWriter<D, C> {
    /// Creates a new writer over the given destination and completion handler.
    pub fn new(destination: D, completion: C, retry_delay: Duration) -> Self {
        Self {
            destination,
            completion,
            retry_delay,
        }
    }

    /// Writes one chunk, retrying until it commits.
    ///
    /// Every failed attempt is logged and retried after the configured fixed
    /// delay; there is no attempt limit and no distinction between transient
    /// and permanent errors. Once the chunk commits, the completion handler is
    /// invoked once per command, in chunk order, consuming the chunk.
    pub async fn write_chunk<R>(&self, chunk: Chunk<R>)
    where
        D: ChunkDestination<R>,
        C: CompletionHandler<R>,
    {
        let mut attempt: u64 = 0;
        let mut state = ChunkWriteState::Executing;

        loop {
            state = match state {
                ChunkWriteState::Executing => {
                    attempt += 1;

                    match self.destination.apply_chunk(&chunk).await {
                        Ok(()) => ChunkWriteState::Committed,
                        Err(err) => {
                            warn!(
                                attempt,
                                chunk_size = chunk.len(),
                                error = %err,
                                "failed to write chunk, transaction rolled back"
                            );

                            ChunkWriteState::Retrying
                        }
                    }
                }
                ChunkWriteState::Retrying => {
                    tokio::time::sleep(self.retry_delay).await;

                    debug!(attempt, "retrying chunk write");

                    ChunkWriteState::Executing
                }
                ChunkWriteState::Committed => break,
            };
        }

        for command in chunk {
            self.completion
                .command_completed(command.reference, command.record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::memory::MemoryDestination;
    use crate::test_utils::{CollectingCompletion, FaultInjectingDestination};
    use crate::translator::translate;
    use crate::types::{Field, Method, Record, SqlValue};

    fn insert_command(reference: u64, name: &str) -> crate::types::Command<u64> {
        let record = Record::new(
            Method::Insert,
            "users",
            vec![
                Field::new("id", SqlValue::I64(reference as i64)),
                Field::new("name", SqlValue::String(name.to_string())),
            ],
            Some("id".to_string()),
        );

        translate(reference, record).unwrap().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn failed_chunks_are_retried_whole_until_commit() {
        let memory = MemoryDestination::new();
        let destination = FaultInjectingDestination::failing(memory.clone(), 2);
        let completion = CollectingCompletion::new();
        let writer = BatchWriter::new(
            destination.clone(),
            completion.clone(),
            Duration::from_secs(5),
        );

        let chunk = vec![
            insert_command(1, "ann"),
            insert_command(2, "bob"),
            insert_command(3, "cleo"),
        ];
        writer.write_chunk(chunk).await;

        // Two failed attempts plus the one that committed.
        assert_eq!(destination.attempts(), 3);

        // The chunk was applied exactly once, as a unit, in order.
        let chunks = memory.applied_chunks().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 3);
        assert_eq!(
            chunks[0].iter().map(|c| c.reference).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        // Completions fired once per command, in chunk order, after commit.
        let completed = completion.completed();
        assert_eq!(
            completed.iter().map(|(r, _)| *r).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_completion_fires_before_the_chunk_commits() {
        let memory = MemoryDestination::new();
        let destination = FaultInjectingDestination::failing(memory.clone(), 1);
        let completion = CollectingCompletion::new();
        let writer = BatchWriter::new(
            destination.clone(),
            completion.clone(),
            Duration::from_secs(5),
        );

        let completion_probe = completion.clone();
        let destination_probe = destination.clone();
        let handle = tokio::spawn(async move {
            writer.write_chunk(vec![insert_command(1, "ann")]).await;
        });

        // Wait until the first attempt has failed; nothing may be completed yet.
        while destination_probe.attempts() < 1 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(completion_probe.completed().is_empty());

        handle.await.unwrap();
        assert_eq!(completion_probe.completed().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_chunk_commits_on_first_attempt() {
        let memory = MemoryDestination::new();
        let completion = CollectingCompletion::new();
        let writer = BatchWriter::new(memory.clone(), completion.clone(), Duration::from_secs(5));

        writer.write_chunk(vec![insert_command(1, "ann")]).await;

        assert_eq!(memory.applied_chunks().await.len(), 1);
        assert_eq!(completion.completed().len(), 1);
    }
}

//! Core pipeline orchestration and execution.
//!
//! Contains the main [`Sink`] struct that wires record translation, the
//! bounded command queue, the batcher and the batch writer into a single
//! write pipeline. Manages the consumer task lifecycle and shutdown
//! coordination.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use sluice_config::shared::PipelineConfig;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::bail;
use crate::completion::CompletionHandler;
use crate::concurrency::shutdown::{ShutdownResult, ShutdownTx, create_shutdown_channel};
use crate::concurrency::stream::BatchStream;
use crate::destination::base::ChunkDestination;
use crate::error::{ErrorKind, SluiceError, SluiceResult};
use crate::queue::{CommandQueue, CommandStream, bounded};
use crate::sluice_error;
use crate::translator::translate;
use crate::types::{Command, PipelineId, Record};
use crate::writer::BatchWriter;

/// Internal state tracking for the sink lifecycle.
///
/// The destination and the completion handler are held here until the sink is
/// started, at which point they move into the spawned consumer task.
enum SinkState<R, D, C> {
    /// The sink has been created but not yet started.
    NotStarted {
        stream: CommandStream<R>,
        destination: D,
        completion: C,
    },
    /// The sink is running with an active consumer task.
    Started { consumer: JoinHandle<()> },
    /// Transient placeholder while the state is being swapped.
    Swapping,
}

/// A write pipeline connecting record producers to a transactional destination.
///
/// A [`Sink`] accepts records through [`Sink::process_record`], translates
/// each into at most one SQL command, and hands the commands to a single
/// consumer task that batches them into chunks and writes every chunk as one
/// transaction with unbounded retry. Delivery is at-least-once: once a record
/// has been accepted, it is either durably committed or the write path stalls,
/// it is never silently dropped.
///
/// `R` is the caller's opaque correlation token, passed back through the
/// completion handler once the corresponding command's chunk commits.
pub struct Sink<R, D, C> {
    config: Arc<PipelineConfig>,
    queue: CommandQueue<R>,
    shutdown_tx: ShutdownTx,
    state: SinkState<R, D, C>,
}

impl<R, D, C> Sink<R, D, C>
where
    R: Send + Sync + 'static,
    D: ChunkDestination<R> + Send + Sync + 'static,
    C: CompletionHandler<R> + Send + 'static,
{
    /// Creates a new sink with the given configuration.
    ///
    /// The sink is initially in the not-started state and must be explicitly
    /// started using [`Sink::start`]. The completion handler is fixed at
    /// construction time; wire in [`crate::completion::NoopCompletion`] when
    /// no acknowledgments are needed.
    pub fn new(config: PipelineConfig, destination: D, completion: C) -> Self {
        let (queue, stream) = bounded(config.queue.capacity);

        // We create a watch channel of unit type since it is only used to
        // notify the consumer that shutdown is needed.
        let (shutdown_tx, _) = create_shutdown_channel();

        Self {
            config: Arc::new(config),
            queue,
            shutdown_tx,
            state: SinkState::NotStarted {
                stream,
                destination,
                completion,
            },
        }
    }

    /// Returns the unique identifier for this pipeline.
    pub fn id(&self) -> PipelineId {
        self.config.id
    }

    /// Returns a handle for sending shutdown signals to this sink.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Returns a cloneable producer handle onto the sink's command queue.
    ///
    /// Detached producers can use it to enqueue pre-translated commands
    /// without holding a reference to the sink itself.
    pub fn command_queue(&self) -> CommandQueue<R> {
        self.queue.clone()
    }

    /// Starts the sink's consumer task.
    ///
    /// The consumer drains the command queue, groups commands into chunks and
    /// writes each chunk through the batch writer. Calling this more than once
    /// is an error.
    pub fn start(&mut self) -> SluiceResult<()> {
        match std::mem::replace(&mut self.state, SinkState::Swapping) {
            SinkState::NotStarted {
                stream,
                destination,
                completion,
            } => {
                info!(pipeline_id = self.config.id, "starting sink pipeline");

                let writer = BatchWriter::new(
                    destination,
                    completion,
                    Duration::from_millis(self.config.retry.delay_ms),
                );
                let batch_stream = BatchStream::wrap(
                    stream,
                    self.config.batch.clone(),
                    self.shutdown_tx.subscribe(),
                );

                let consumer =
                    tokio::spawn(run_consumer_loop(self.config.id, batch_stream, writer));
                self.state = SinkState::Started { consumer };

                Ok(())
            }
            state => {
                self.state = state;

                bail!(
                    ErrorKind::InvalidState,
                    "The sink pipeline was already started"
                );
            }
        }
    }

    /// Translates a record and enqueues the resulting command.
    ///
    /// Returns synchronously with an error when translation fails; records
    /// whose method cannot be expressed against the destination (updates and
    /// deletes without a primary key, unsupported methods) are silently
    /// accepted and produce no command. The call suspends while the command
    /// queue is full, propagating backpressure to the producer.
    pub async fn process_record(&self, reference: R, record: Record) -> SluiceResult<()> {
        let Some(command) = translate(reference, record)? else {
            return Ok(());
        };

        self.queue.enqueue(command).await
    }

    /// Initiates graceful shutdown of the sink.
    ///
    /// Signals the consumer task, which flushes the open chunk and terminates.
    /// This method returns immediately; use [`Sink::wait`] to wait for the
    /// consumer to actually stop.
    pub fn shutdown(&self) {
        info!("trying to shut down the sink pipeline");

        if let Err(err) = self.shutdown_tx.shutdown() {
            error!("failed to send shutdown signal to the sink pipeline: {}", err);
            return;
        }

        info!("shutdown signal successfully sent to the batch consumer");
    }

    /// Waits for the sink's consumer task to terminate.
    ///
    /// The sink's own producer handle is dropped first, so once every external
    /// [`CommandQueue`] clone is gone the queue closes and the consumer drains
    /// the remaining commands and exits even without a shutdown signal.
    pub async fn wait(self) -> SluiceResult<()> {
        let Self { state, queue, .. } = self;
        drop(queue);

        let SinkState::Started { consumer } = state else {
            info!("the sink pipeline was not started, nothing to wait for");

            return Ok(());
        };

        info!("waiting for the batch consumer to complete");

        consumer.await.map_err(|err| {
            sluice_error!(
                ErrorKind::ConsumerPanic,
                "The batch consumer task panicked",
                err
            )
        })?;

        Ok(())
    }

    /// Initiates shutdown and waits for complete sink termination.
    pub async fn shutdown_and_wait(self) -> SluiceResult<()> {
        self.shutdown();
        self.wait().await
    }
}

/// The single consumer loop draining batches from the queue.
///
/// Chunks are written strictly sequentially: the next chunk is not taken from
/// the stream before the previous one has committed. On shutdown the open
/// chunk, if any, is flushed and written before the loop exits.
async fn run_consumer_loop<R, D, C>(
    pipeline_id: PipelineId,
    stream: BatchStream<Command<R>, CommandStream<R>>,
    writer: BatchWriter<D, C>,
) where
    R: Send,
    D: ChunkDestination<R>,
    C: CompletionHandler<R>,
{
    info!(pipeline_id, "batch consumer started");

    let mut stream = std::pin::pin!(stream);
    while let Some(result) = stream.next().await {
        match result {
            ShutdownResult::Ok(chunk) => {
                writer.write_chunk(chunk).await;
            }
            ShutdownResult::Shutdown(chunk) => {
                if !chunk.is_empty() {
                    info!(
                        pipeline_id,
                        chunk_size = chunk.len(),
                        "writing the open chunk before shutdown"
                    );

                    writer.write_chunk(chunk).await;
                }

                break;
            }
        }
    }

    info!(pipeline_id, "batch consumer stopped");
}

use sluice::completion::NoopCompletion;
use sluice::destination::base::ChunkDestination;
use sluice::destination::memory::MemoryDestination;
use sluice::destination::postgres::PostgresDestination;
use sluice::pipeline::Sink;
use sluice_config::shared::{
    BatchConfig, DestinationConfig, PgConnectionConfig, PipelineConfig, QueueConfig, RetryConfig,
    TransmitterConfig,
};
use tracing::info;

use crate::config::load_transmitter_config;

/// Reference type attached to records by the embedding producer.
///
/// The transmitter itself does not produce records; the upstream entry point
/// enqueues them through the sink's queue handle and correlates completions by
/// this token.
type Reference = u64;

pub async fn start_transmitter() -> anyhow::Result<()> {
    info!("starting transmitter service");
    let transmitter_config = load_transmitter_config()?;

    log_config(&transmitter_config);

    // For each destination, we start the sink. This is more verbose due to
    // static dispatch, but we prefer more performance at the cost of ergonomics.
    match &transmitter_config.destination {
        DestinationConfig::Memory => {
            let destination = MemoryDestination::new();

            run_sink(transmitter_config.pipeline, destination).await?;
        }
        DestinationConfig::Postgres { connection, pool } => {
            let destination = PostgresDestination::connect(connection, pool).await?;

            run_sink(transmitter_config.pipeline, destination).await?;
        }
    }

    info!("transmitter service completed");
    Ok(())
}

/// Builds, starts and supervises a sink until the process is told to stop.
async fn run_sink<D>(config: PipelineConfig, destination: D) -> anyhow::Result<()>
where
    D: ChunkDestination<Reference> + Send + Sync + 'static,
{
    let mut sink = Sink::new(config, destination, NoopCompletion);
    sink.start()?;

    info!("sink pipeline started, waiting for termination signal");

    tokio::signal::ctrl_c().await?;

    info!("termination signal received, shutting down the sink pipeline");
    sink.shutdown_and_wait().await?;

    Ok(())
}

fn log_config(config: &TransmitterConfig) {
    log_destination_config(&config.destination);
    log_pipeline_config(&config.pipeline);
}

fn log_destination_config(config: &DestinationConfig) {
    match config {
        DestinationConfig::Memory => {
            info!("memory destination config");
        }
        DestinationConfig::Postgres { connection, pool } => {
            log_pg_connection_config(connection);
            info!(max_connections = pool.max_connections, "pool config");
        }
    }
}

fn log_pipeline_config(config: &PipelineConfig) {
    info!(pipeline_id = config.id, "pipeline config");
    log_queue_config(&config.queue);
    log_batch_config(&config.batch);
    log_retry_config(&config.retry);
}

fn log_pg_connection_config(config: &PgConnectionConfig) {
    info!(
        host = config.host,
        port = config.port,
        dbname = config.name,
        username = config.username,
        tls_enabled = config.tls.enabled,
        "destination postgres connection config",
    );
}

fn log_queue_config(config: &QueueConfig) {
    info!(capacity = config.capacity, "queue config");
}

fn log_batch_config(config: &BatchConfig) {
    info!(
        max_size = config.max_size,
        max_fill_ms = config.max_fill_ms,
        "batch config"
    );
}

fn log_retry_config(config: &RetryConfig) {
    info!(delay_ms = config.delay_ms, "retry config");
}

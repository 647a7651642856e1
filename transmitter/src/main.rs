use sluice_telemetry::init_tracing;

use crate::core::start_transmitter;

mod config;
mod core;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_name = env!("CARGO_BIN_NAME");

    // We keep the guard alive for the lifetime of the process so buffered log
    // lines are flushed on exit.
    let _log_flusher = init_tracing(app_name)?;

    // We start the transmitter.
    start_transmitter().await?;

    Ok(())
}

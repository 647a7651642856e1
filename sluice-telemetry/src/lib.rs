//! Tracing initialization for sluice services.
//!
//! Provides a single entry point to set up structured logging: JSON output in
//! production, human-readable output in development, with an env-filter and a
//! non-blocking stdout writer.

use std::sync::Once;

use sluice_config::Environment;
use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Default directive applied when `RUST_LOG` is not set.
const DEFAULT_LOG_DIRECTIVE: &str = "info";

/// Errors that can occur while initializing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The runtime environment could not be determined.
    #[error("failed to load the runtime environment: {0}")]
    Environment(#[from] std::io::Error),

    /// A global tracing subscriber was already installed.
    #[error("failed to set the global tracing subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),

    /// The `log` compatibility bridge was already installed.
    #[error("failed to install the log tracer: {0}")]
    LogTracer(#[from] tracing_log::log::SetLoggerError),
}

/// Initializes the global tracing subscriber for a service.
///
/// Installs an env-filtered subscriber writing to stdout through a non-blocking
/// writer. In production the output is JSON, in development it is pretty-printed
/// with ANSI colors. `log` records are bridged into tracing.
///
/// The returned [`WorkerGuard`] must be kept alive for the lifetime of the
/// process, otherwise buffered log lines are lost on exit.
pub fn init_tracing(app_name: &str) -> Result<WorkerGuard, TelemetryError> {
    let environment = Environment::load()?;

    LogTracer::init()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    if environment.is_prod() {
        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_ansi(false).with_writer(writer));
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_writer(writer));
        tracing::subscriber::set_global_default(subscriber)?;
    }

    tracing::info!(app = app_name, environment = %environment, "telemetry initialized");

    Ok(guard)
}

/// Initializes a test tracing subscriber, at most once per process.
///
/// Output is captured by the test harness and only shown for failing tests.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

        let _ = fmt()
            .with_env_filter(env_filter)
            .with_test_writer()
            .try_init();
    });
}

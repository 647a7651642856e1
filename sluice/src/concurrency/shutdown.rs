use tokio::sync::watch;

/// Sending half of the shutdown signal.
///
/// The signal is a watch channel of unit: subscribers only care that a change
/// happened, not about any payload.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<()>);

impl ShutdownTx {
    /// Signals shutdown to all subscribers.
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }

    /// Creates a new receiving half listening on this signal.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Receiving half of the shutdown signal.
pub type ShutdownRx = watch::Receiver<()>;

/// Outcome of an operation that can be interrupted by shutdown.
pub enum ShutdownResult<T, I> {
    /// The operation completed normally.
    Ok(T),
    /// Shutdown was signaled; carries whatever was accumulated so far.
    Shutdown(I),
}

impl<T, I> ShutdownResult<T, I> {
    pub fn should_shutdown(&self) -> bool {
        matches!(self, ShutdownResult::Shutdown(_))
    }
}

/// Creates a connected pair of shutdown halves.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());
    (ShutdownTx(tx), rx)
}

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,

    /// The command queue must be able to hold at least one command.
    #[error("Invalid queue config: `capacity` must be greater than 0")]
    QueueCapacityZero,

    /// A chunk must be able to hold at least one command.
    #[error("Invalid batch config: `max_size` must be greater than 0")]
    BatchMaxSizeZero,

    /// The connection pool must be able to open at least one connection.
    #[error("Invalid pool config: `max_connections` must be greater than 0")]
    MaxConnectionsZero,
}

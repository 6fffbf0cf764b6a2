//! Error types for ntsh.

use thiserror::Error;

use crate::protocol::ProtocolConfigError;

/// Main error type for all ntsh operations.
#[derive(Debug, Error)]
pub enum NtshError {
    /// Could not establish the connection to the remote endpoint.
    #[error("Could not connect to {host}:{port}: {source}")]
    Connect {
        /// Host part of the endpoint.
        host: String,
        /// Port part of the endpoint.
        port: u16,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error on an established connection or on the terminal.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol specifier could not be resolved.
    #[error(transparent)]
    ProtocolConfig(#[from] ProtocolConfigError),

    /// Endpoint string is not of the form `HOST:PORT`.
    #[error("invalid endpoint '{value}': {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint string.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Connection was used after it was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The render task has gone away.
    #[error("Renderer closed")]
    RenderClosed,

    /// Logging could not be initialised.
    #[error("failed to initialise logging: {0}")]
    Telemetry(String),
}

/// Result type alias using NtshError.
pub type Result<T> = std::result::Result<T, NtshError>;

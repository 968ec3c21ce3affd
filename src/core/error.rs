//! Error types for the virtual port network

use thiserror::Error;

/// Fatal network errors, surfaced to the caller of `start`
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The worker context could not be launched
    #[error("Failed to spawn network worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

/// Per-port failures inside the worker.
///
/// None of these stop the worker; each becomes a single response.
#[derive(Error, Debug)]
pub enum PortError {
    /// A pseudo-terminal could not be allocated
    #[error("Failed to create pseudo-terminal: {0}")]
    ResourceExhaustion(#[source] std::io::Error),

    /// The port name is already registered
    #[error("Port already added: {0}")]
    DuplicateName(String),

    /// The port name is not registered
    #[error("Port not found: {0}")]
    NotFound(String),

    /// A real serial device could not be opened
    #[error("Failed to open serial port {port}: {source}")]
    DeviceOpen {
        /// Device name
        port: String,
        /// Underlying error
        #[source]
        source: serialport::Error,
    },

    /// A descriptor could not be configured for the readiness loop
    #[error("Failed to configure {port}: {source}")]
    Configure {
        /// Port name
        port: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A broadcast write to one peer failed
    #[error("Write to {port} failed: {source}")]
    TransientWriteFailure {
        /// Target port
        port: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

//! Error types for loom.

use thiserror::Error;

/// Result type alias using loom's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for loom operations.
///
/// Store errors are split along the axis the retry policy cares about:
/// [`Error::TransientStore`] is the only variant that consumes retry
/// budget; everything else aborts the operation on first occurrence.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing settings. Fatal at startup, never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A session to the remote store could not be established or has
    /// become unusable. Invalidates the connection handle.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Timeout or temporary unavailability of the remote store.
    #[error("Transient store error: {0}")]
    TransientStore(String),

    /// Permission denied, malformed request, or other failure that
    /// retrying cannot fix.
    #[error("Permanent store error: {0}")]
    PermanentStore(String),

    /// The retry budget was spent without a successful attempt.
    #[error("Retry budget exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Message of the last transient failure observed.
        last: String,
    },

    /// Caller-initiated abort (shutdown or cancellation signal).
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the retry policy may spend budget on this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientStore(_))
    }

    /// Whether the connection handle must be invalidated and re-dialed
    /// on the next operation.
    pub fn is_connection_fault(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

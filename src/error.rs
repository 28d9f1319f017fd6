//! Crate-level error type

use crate::store::StoreError;

/// Errors raised by the network front end
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request or response could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Store rejected the operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Client sent a line longer than the configured limit
    #[error("request line exceeds {0} bytes")]
    LineTooLong(usize),

    /// Peer did not accept a write in time
    #[error("write timed out")]
    WriteTimeout,
}

/// Result alias for front-end operations
pub type Result<T> = std::result::Result<T, Error>;

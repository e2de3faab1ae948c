//! Error types for firkin.

use std::io;
use thiserror::Error;

/// Result type alias for firkin operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for store operations.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Key absent from the directory, or resolved to a tombstone.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Data corruption detected.
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// CRC checksum mismatch.
    #[error("CRC mismatch: expected {expected:#x}, got {actual:#x}")]
    CrcMismatch { expected: u32, actual: u32 },

    /// I/O error from file operations.
    #[error("I/O error: {0}")]
    Io(String),

    /// Invariant violation discovered at runtime.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// Create a not-found error for the given key.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a corruption error with the given message.
    pub fn corruption<S: Into<String>>(msg: S) -> Self {
        Error::Corruption(msg.into())
    }

    /// Create an internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Check if this error means the key is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this error indicates corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_) | Error::CrcMismatch { .. })
    }
}

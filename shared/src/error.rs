/*!
Common error types for the oscilloscope client Rust components.
*/

use std::time::Duration;
use thiserror::Error;

/// Common result type used throughout the shared library
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Comprehensive error type for all acquisition operations
#[derive(Error, Debug)]
pub enum ScopeError {
    /// A timebase or trigger-edge value outside the supported enumeration
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    /// An operation that requires a live transport was attempted while disconnected
    #[error("device not connected")]
    NotConnected,

    /// Open/write/read failure at the transport boundary
    #[error("transport error: {0}")]
    Transport(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device did not respond within the bounded capture window
    #[error("device did not respond within {0:?}")]
    Timeout(Duration),

    /// A raw frame with the wrong number of bytes
    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// The acquisition worker thread is no longer running
    #[error("acquisition worker stopped")]
    WorkerStopped,
}

impl ScopeError {
    /// Create a new unsupported-value error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedValue(msg.into())
    }

    /// Create a new transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

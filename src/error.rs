//! Error types for the transport.
//!
//! Worker tasks never surface these to the application directly; they are
//! converted into a [`DisconnectReason`](crate::event::DisconnectReason) and
//! delivered through the event queue. The façade only returns them where a
//! caller can act on them synchronously, such as binding a listener.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur inside the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// I/O error reported by a socket call.
    #[error("I/O error: {message}")]
    Io {
        /// Kind of the underlying I/O error.
        kind: io::ErrorKind,
        /// Raw OS error number, if the error came from the OS.
        code: Option<i32>,
        /// Human-readable description.
        message: String,
    },

    /// Incoming frame length exceeds the configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Announced frame length.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Incoming frame announced a zero length.
    #[error("Zero-length frame")]
    EmptyFrame,

    /// Outgoing message exceeds the configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Host name could not be resolved to a usable address.
    #[error("Address resolution failed: {0}")]
    Resolve(String),

    /// Connect did not complete within the configured timeout.
    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Operation was cancelled by a local disconnect.
    #[error("Operation cancelled")]
    Cancelled,

    /// Endpoint is already running.
    #[error("Already active")]
    AlreadyActive,
}

impl Error {
    /// Returns `true` if this error means the byte stream can no longer be
    /// trusted (as opposed to the socket itself failing).
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(self, Error::FrameTooLarge { .. } | Error::EmptyFrame)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io {
            kind: err.kind(),
            code: err.raw_os_error(),
            message: err.to_string(),
        }
    }
}

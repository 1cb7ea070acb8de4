//! Events delivered from workers to the application.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use bytes::Bytes;

use crate::error::Error;

/// Identifier of a connection.
///
/// The client's connection is always `0`; server connections count up
/// from `1`.
pub type ConnectionId = u32;

/// Machine-readable classification of why a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ReasonCode {
    /// The peer closed the stream.
    Closed,
    /// The connection was torn down locally while established.
    LocalClose,
    /// A pending connect was cancelled locally.
    Cancelled,
    /// The peer refused the connection.
    Refused,
    /// The peer reset the connection.
    Reset,
    /// Connect or write did not complete in time.
    TimedOut,
    /// No route to the peer's network or host.
    Unreachable,
    /// The host name did not resolve to a usable address.
    ResolveFailed,
    /// The peer sent an invalid frame.
    ProtocolViolation,
    /// Any other I/O failure.
    Io,
}

impl ReasonCode {
    /// Classify an I/O error kind.
    #[must_use]
    pub fn from_io_kind(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::ConnectionRefused => ReasonCode::Refused,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => ReasonCode::Reset,
            io::ErrorKind::TimedOut => ReasonCode::TimedOut,
            io::ErrorKind::NetworkUnreachable | io::ErrorKind::HostUnreachable => {
                ReasonCode::Unreachable
            }
            io::ErrorKind::UnexpectedEof => ReasonCode::Closed,
            _ => ReasonCode::Io,
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReasonCode::Closed => "Closed",
            ReasonCode::LocalClose => "LocalClose",
            ReasonCode::Cancelled => "Cancelled",
            ReasonCode::Refused => "Refused",
            ReasonCode::Reset => "Reset",
            ReasonCode::TimedOut => "TimedOut",
            ReasonCode::Unreachable => "Unreachable",
            ReasonCode::ResolveFailed => "ResolveFailed",
            ReasonCode::ProtocolViolation => "ProtocolViolation",
            ReasonCode::Io => "Io",
        };
        f.write_str(s)
    }
}

/// Why a connection ended, attached to every `Disconnected` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReason {
    /// Classification.
    pub code: ReasonCode,
    /// Raw OS error number, when the failure came from a socket call.
    pub os_error: Option<i32>,
    /// Human-readable description.
    pub message: String,
    /// Whether the connection was established before it ended.
    ///
    /// Set by the connection when the event is emitted, so a `TimedOut`
    /// while connecting and a `TimedOut` on a live link stay distinct.
    pub connected: bool,
}

impl DisconnectReason {
    /// Create a reason without an OS error number.
    #[must_use]
    pub fn new(code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            code,
            os_error: None,
            message: message.into(),
            connected: false,
        }
    }

    /// Returns `true` if the connection never came up.
    #[must_use]
    pub const fn is_connect_failure(&self) -> bool {
        !self.connected
    }

    /// The peer closed the stream.
    #[must_use]
    pub fn closed() -> Self {
        Self::new(ReasonCode::Closed, "connection closed by peer")
    }

    /// The connection was closed locally.
    #[must_use]
    pub fn local_close() -> Self {
        Self::new(ReasonCode::LocalClose, "connection closed locally")
    }

    /// A pending connect was cancelled.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(ReasonCode::Cancelled, "connect cancelled")
    }
}

impl From<&Error> for DisconnectReason {
    fn from(err: &Error) -> Self {
        let code = match err {
            Error::Io { kind, .. } => ReasonCode::from_io_kind(*kind),
            Error::FrameTooLarge { .. } | Error::EmptyFrame => ReasonCode::ProtocolViolation,
            Error::Resolve(_) => ReasonCode::ResolveFailed,
            Error::ConnectTimeout(_) => ReasonCode::TimedOut,
            Error::Cancelled => ReasonCode::Cancelled,
            Error::AlreadyActive | Error::MessageTooLarge { .. } => ReasonCode::Io,
        };
        let os_error = match err {
            Error::Io { code, .. } => *code,
            _ => None,
        };
        Self {
            code,
            os_error,
            message: err.to_string(),
            connected: false,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.os_error {
            Some(code) => write!(f, "{} (os error {}): {}", self.code, code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Observation handed from a worker to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Event {
    /// An inbound connection was accepted; it is not yet ready for traffic.
    PreConnect {
        /// Connection id assigned to the new connection.
        id: ConnectionId,
        /// Address the connection originates from.
        origin: SocketAddr,
    },
    /// The connection is established and accepts `send`.
    Connected {
        /// Connection id.
        id: ConnectionId,
    },
    /// One complete message arrived.
    Data {
        /// Connection id.
        id: ConnectionId,
        /// Message payload.
        payload: Bytes,
    },
    /// The connection ended or never came up. Emitted exactly once per
    /// connection attempt.
    Disconnected {
        /// Connection id.
        id: ConnectionId,
        /// Why it ended.
        reason: DisconnectReason,
    },
}

impl Event {
    /// Connection id the event belongs to.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        match self {
            Event::PreConnect { id, .. }
            | Event::Connected { id }
            | Event::Data { id, .. }
            | Event::Disconnected { id, .. } => *id,
        }
    }

    /// Returns `true` for `Disconnected`.
    #[must_use]
    pub const fn is_disconnected(&self) -> bool {
        matches!(self, Event::Disconnected { .. })
    }
}

//! Connection lifecycle states.

/// Lifecycle state of a single connection attempt.
///
/// States only move forward: `Idle → Connecting → Connected → Disconnecting
/// → Closed`. Teardown may jump to `Disconnecting` or `Closed` from any
/// earlier state; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum ConnectionState {
    /// Created, no work started.
    #[default]
    Idle = 0,
    /// Resolving and connecting.
    Connecting = 1,
    /// Established; send and receive workers are running.
    Connected = 2,
    /// Teardown in progress.
    Disconnecting = 3,
    /// Fully torn down.
    Closed = 4,
}

impl ConnectionState {
    /// Check if the connection is still in use.
    ///
    /// Returns `true` for `Connecting` and `Connected`.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }

    /// Check if sending data is allowed in this state.
    ///
    /// Returns `true` only for `Connected`.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "Idle"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Disconnecting => write!(f, "Disconnecting"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}

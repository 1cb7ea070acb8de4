//! Configuration for client and server endpoints.

use std::time::Duration;

/// Transport configuration shared by [`Client`](crate::Client) and
/// [`Server`](crate::Server).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum payload size of a single message in bytes.
    ///
    /// Applies to both directions: larger outgoing messages are rejected by
    /// `send`, larger incoming frames force a disconnect.
    ///
    /// Default: 16 KB (16 * 1024)
    pub max_message_size: usize,

    /// Disable Nagle's algorithm on connected sockets.
    ///
    /// Default: true
    pub no_delay: bool,

    /// Maximum time a single batch of queued messages may take to write.
    ///
    /// A write that does not complete in time tears the connection down.
    /// Default: 5 seconds
    pub send_timeout: Duration,

    /// Tick on which a pending connect re-checks its deadline.
    ///
    /// Cancellation is observed immediately; the tick only bounds how late a
    /// connect timeout is detected.
    /// Default: 100 ms
    pub connect_poll_interval: Duration,

    /// Upper bound for name resolution plus connect.
    ///
    /// If `None`, the operating system's own connect timeout applies.
    /// Default: 30 seconds
    pub connect_timeout: Option<Duration>,

    /// Grace period a worker gets to exit during teardown before it is
    /// aborted.
    ///
    /// Default: 1 second
    pub join_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_message_size: 16 * 1024,
            no_delay: true,
            send_timeout: Duration::from_secs(5),
            connect_poll_interval: Duration::from_millis(100),
            connect_timeout: Some(Duration::from_secs(30)),
            join_timeout: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for low-latency local networks.
    ///
    /// - Max message: 64 KB
    /// - Send timeout: 1 s
    /// - Connect timeout: 2 s
    #[must_use]
    pub fn lan() -> Self {
        Self {
            max_message_size: 64 * 1024,
            send_timeout: Duration::from_secs(1),
            connect_timeout: Some(Duration::from_secs(2)),
            ..Default::default()
        }
    }

    /// Configuration for high-latency wide area links.
    ///
    /// - Send timeout: 15 s
    /// - Connect timeout: 60 s
    /// - Join timeout: 3 s
    #[must_use]
    pub fn wan() -> Self {
        Self {
            send_timeout: Duration::from_secs(15),
            connect_timeout: Some(Duration::from_secs(60)),
            join_timeout: Duration::from_secs(3),
            ..Default::default()
        }
    }

    /// Set the maximum message size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Enable or disable `TCP_NODELAY`.
    #[must_use]
    pub const fn with_no_delay(mut self, no_delay: bool) -> Self {
        self.no_delay = no_delay;
        self
    }

    /// Set the send timeout.
    #[must_use]
    pub const fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the connect poll interval.
    #[must_use]
    pub const fn with_connect_poll_interval(mut self, interval: Duration) -> Self {
        self.connect_poll_interval = interval;
        self
    }

    /// Set the connect timeout. `None` disables it.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the worker join grace period.
    #[must_use]
    pub const fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Validate that a payload may be sent or received under this
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`](crate::Error::MessageTooLarge) if
    /// `size` exceeds `max_message_size`.
    pub const fn check_message_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_message_size {
            Err(crate::Error::MessageTooLarge {
                size,
                max: self.max_message_size,
            })
        } else {
            Ok(())
        }
    }
}

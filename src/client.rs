//! Client endpoint: one outbound connection at a time.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::config::Config;
use crate::connection::{Connection, ConnectionState, Role};
use crate::event::{ConnectionId, DisconnectReason, Event};
use crate::queue::MessageQueue;
use crate::worker::connect::connect_worker;

/// Connection id used for the client's connection.
pub const CLIENT_CONNECTION_ID: ConnectionId = 0;

/// Outbound message transport.
///
/// `connect` and `send` never block: they hand the work to background
/// tasks and report the outcome through the event queue. `disconnect`
/// resolves only after every worker of the connection has exited.
///
/// ## Example
///
/// ```rust,ignore
/// use tcpwire::{Client, Config, Event};
///
/// let client = Client::new(Config::default());
/// client.connect("127.0.0.1", 7777);
///
/// loop {
///     match client.next_event().await {
///         Event::Connected { .. } => { client.send(&b"hello"[..]); }
///         Event::Data { payload, .. } => println!("got {} bytes", payload.len()),
///         Event::Disconnected { reason, .. } => break,
///         _ => {}
///     }
/// }
/// client.disconnect().await;
/// ```
#[derive(Debug)]
pub struct Client {
    config: Config,
    events: Arc<MessageQueue<Event>>,
    current: Mutex<Option<Arc<Connection>>>,
    teardown: tokio::sync::Mutex<()>,
}

impl Client {
    /// Create a client. No connection is made until [`connect`](Self::connect).
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            events: Arc::new(MessageQueue::new()),
            current: Mutex::new(None),
            teardown: tokio::sync::Mutex::new(()),
        }
    }

    /// The configuration this client was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn current(&self) -> MutexGuard<'_, Option<Arc<Connection>>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn connection(&self) -> Option<Arc<Connection>> {
        self.current().clone()
    }

    /// State of the current (or most recent) connection attempt.
    pub fn state(&self) -> ConnectionState {
        self.connection()
            .map_or(ConnectionState::Idle, |conn| conn.state())
    }

    /// Returns `true` while the connection is established.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns `true` while a connect is pending.
    pub fn is_connecting(&self) -> bool {
        self.state() == ConnectionState::Connecting
    }

    /// Start connecting to `host:port` in the background.
    ///
    /// Returns `false` without doing anything if a connection is already
    /// connecting, connected or being torn down, or if called outside a
    /// Tokio runtime. Otherwise clears stale events from the previous
    /// session and returns `true`; the outcome arrives as `Connected` or
    /// `Disconnected`.
    pub fn connect(&self, host: impl Into<String>, port: u16) -> bool {
        let Ok(_teardown) = self.teardown.try_lock() else {
            debug!("connect rejected: disconnect in progress");
            return false;
        };
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("connect rejected: no Tokio runtime");
            return false;
        }

        let mut current = self.current();
        if let Some(conn) = current.as_ref() {
            let state = conn.state();
            if state != ConnectionState::Closed {
                debug!(%state, "connect rejected: connection not closed");
                return false;
            }
        }

        // Events from the previous session would confuse the caller.
        self.events.clear();

        let host = host.into();
        debug!(%host, port, "connecting");
        let conn = Arc::new(Connection::new(
            CLIENT_CONNECTION_ID,
            Role::Client,
            self.config.clone(),
            self.events.clone(),
        ));
        conn.begin_connecting();
        conn.spawn_worker(connect_worker(conn.clone(), host, port));
        *current = Some(conn);
        true
    }

    /// Tear the connection down and wait for its workers to exit.
    ///
    /// Idempotent. Pending outgoing messages are discarded; events already
    /// queued (including the final `Disconnected`) remain available.
    pub async fn disconnect(&self) {
        let _teardown = self.teardown.lock().await;
        let Some(conn) = self.connection() else {
            return;
        };
        conn.shutdown().await;
    }

    /// Queue `payload` for sending.
    ///
    /// Returns `false` if not connected, if the payload is empty, or if it
    /// exceeds `max_message_size`. `true` only means the message was queued.
    pub fn send(&self, payload: impl Into<Bytes>) -> bool {
        match self.connection() {
            Some(conn) => conn.send(payload.into()),
            None => {
                warn!("send rejected: not connected");
                false
            }
        }
    }

    /// Take the next event if one is queued.
    pub fn try_next_event(&self) -> Option<Event> {
        self.events.try_pop()
    }

    /// Wait for the next event.
    pub async fn next_event(&self) -> Event {
        self.events.pop().await
    }

    /// Take all queued events.
    pub fn drain_events(&self) -> Vec<Event> {
        self.events.drain()
    }

    /// Number of queued events.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(conn) = self.current().take() {
            conn.abort(DisconnectReason::local_close());
        }
    }
}

//! Server endpoint: accepts inbound connections and multiplexes their
//! events into one queue.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, instrument, warn};

use crate::config::Config;
use crate::connection::{Connection, Role};
use crate::error::{Error, Result};
use crate::event::{ConnectionId, DisconnectReason, Event};
use crate::queue::MessageQueue;
use crate::worker::{join_worker, run_session};

type ClientMap = Arc<Mutex<HashMap<ConnectionId, Arc<Connection>>>>;

fn lock_clients(clients: &ClientMap) -> MutexGuard<'_, HashMap<ConnectionId, Arc<Connection>>> {
    clients.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug)]
struct Listener {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// Inbound message transport.
///
/// Every accepted connection gets a fresh id (starting at 1, never reused
/// for the lifetime of the server) and reports `PreConnect`, then
/// `Connected`, then any number of `Data`, then exactly one `Disconnected`.
///
/// ## Example
///
/// ```rust,ignore
/// use tcpwire::{Config, Event, Server};
///
/// let server = Server::new(Config::default());
/// server.start("0.0.0.0:7777").await?;
///
/// loop {
///     if let Event::Data { id, payload } = server.next_event().await {
///         server.send(id, payload);
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Server {
    config: Config,
    events: Arc<MessageQueue<Event>>,
    clients: ClientMap,
    next_id: Arc<AtomicU32>,
    listener: Mutex<Option<Listener>>,
}

impl Server {
    /// Create a server. Nothing is bound until [`start`](Self::start).
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            events: Arc::new(MessageQueue::new()),
            clients: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU32::new(1)),
            listener: Mutex::new(None),
        }
    }

    /// The configuration this server was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn listener(&self) -> MutexGuard<'_, Option<Listener>> {
        self.listener.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Bind `addr` and start accepting connections.
    ///
    /// Returns the bound address, which differs from `addr` when binding
    /// port 0.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyActive`] if the server is running, or the bind error.
    pub async fn start(&self, addr: impl ToSocketAddrs) -> Result<SocketAddr> {
        if self.is_active() {
            return Err(Error::AlreadyActive);
        }

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let mut slot = self.listener();
        if slot.is_some() {
            return Err(Error::AlreadyActive);
        }

        // Stale events from a previous run.
        self.events.clear();

        let cancel = CancellationToken::new();
        let accept = AcceptLoop {
            listener,
            cancel: cancel.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
            clients: self.clients.clone(),
            next_id: self.next_id.clone(),
        };
        let handle = tokio::spawn(accept.run());
        *slot = Some(Listener {
            cancel,
            handle,
            local_addr,
        });

        info!(%local_addr, "server started");
        Ok(local_addr)
    }

    /// Stop accepting and tear down every connection.
    ///
    /// Each open connection reports its `Disconnected` event before this
    /// returns. Calling it on a stopped server is a no-op.
    pub async fn stop(&self) {
        let Some(listener) = self.listener().take() else {
            return;
        };
        listener.cancel.cancel();
        join_worker(listener.handle, self.config.join_timeout, "accept").await;

        let connections: Vec<Arc<Connection>> =
            lock_clients(&self.clients).drain().map(|(_, conn)| conn).collect();
        debug!(count = connections.len(), "closing connections");

        let mut shutdowns = JoinSet::new();
        for conn in connections {
            shutdowns.spawn(async move { conn.shutdown().await });
        }
        while let Some(result) = shutdowns.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "connection shutdown failed");
            }
        }

        info!(local_addr = %listener.local_addr, "server stopped");
    }

    /// Returns `true` while the listener is running.
    pub fn is_active(&self) -> bool {
        self.listener().is_some()
    }

    /// Address the listener is bound to, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener().as_ref().map(|l| l.local_addr)
    }

    fn connection(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        lock_clients(&self.clients).get(&id).cloned()
    }

    /// Queue `payload` for connection `id`.
    ///
    /// Returns `false` for unknown ids, connections that are not established,
    /// empty payloads, and payloads over `max_message_size`.
    pub fn send(&self, id: ConnectionId, payload: impl Into<Bytes>) -> bool {
        match self.connection(id) {
            Some(conn) => conn.send(payload.into()),
            None => {
                warn!(id, "send rejected: unknown connection");
                false
            }
        }
    }

    /// Disconnect one connection and wait for its workers to exit.
    ///
    /// Returns `false` if `id` is not (or no longer) connected.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let Some(conn) = lock_clients(&self.clients).remove(&id) else {
            return false;
        };
        conn.shutdown().await;
        true
    }

    /// Remote address of connection `id`.
    pub fn client_address(&self, id: ConnectionId) -> Option<SocketAddr> {
        self.connection(id).and_then(|conn| conn.peer_addr())
    }

    /// Number of connections currently tracked.
    pub fn connection_count(&self) -> usize {
        lock_clients(&self.clients).len()
    }

    /// Take the next event if one is queued. Events from all connections share one queue.
    pub fn try_next_event(&self) -> Option<Event> {
        self.events.try_pop()
    }

    /// Wait for the next event from any connection.
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

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(listener) = self.listener().take() {
            listener.cancel.cancel();
            listener.handle.abort();
        }
        for (_, conn) in lock_clients(&self.clients).drain() {
            conn.abort(DisconnectReason::local_close());
        }
    }
}

struct AcceptLoop {
    listener: TcpListener,
    cancel: CancellationToken,
    config: Config,
    events: Arc<MessageQueue<Event>>,
    clients: ClientMap,
    next_id: Arc<AtomicU32>,
}

impl AcceptLoop {
    #[instrument(name = "accept", skip_all)]
    async fn run(self) {
        loop {
            let accepted = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, origin)) => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    debug!(id, %origin, "accepted connection");

                    let conn = Arc::new(Connection::new(
                        id,
                        Role::Server,
                        self.config.clone(),
                        self.events.clone(),
                    ));
                    conn.set_peer_addr(origin);
                    conn.begin_connecting();
                    conn.emit(Event::PreConnect { id, origin });
                    lock_clients(&self.clients).insert(id, conn.clone());

                    let clients = self.clients.clone();
                    let session = conn.clone();
                    conn.spawn_worker(
                        async move {
                            run_session(session, stream).await;
                            lock_clients(&clients).remove(&id);
                        }
                        .instrument(Span::current()),
                    );
                }
                Err(e) => {
                    // Typically fd exhaustion; keep serving the others.
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
        debug!("accept loop stopped");
    }
}

const ACCEPT_BACKOFF: std::time::Duration = std::time::Duration::from_millis(10);

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use bytes::Bytes;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::config::Config;
use crate::connection::{ConnectionState, Role};
use crate::event::{ConnectionId, DisconnectReason, Event};
use crate::queue::MessageQueue;

#[derive(Debug, Default)]
struct Lifecycle {
    state: ConnectionState,
    close_reason: Option<DisconnectReason>,
    disconnect_emitted: bool,
    established: bool,
}

/// One connection attempt: its id, state, outgoing queue and workers.
///
/// Shared between the owning façade and the connect/send/receive workers.
/// The socket itself is never stored here; the connect worker owns it until
/// it is split into a read half for the receive worker and a write half for
/// the send worker.
#[derive(Debug)]
pub(crate) struct Connection {
    id: ConnectionId,
    role: Role,
    config: Config,
    lifecycle: Mutex<Lifecycle>,
    cancel: CancellationToken,
    outgoing: MessageQueue<Bytes>,
    events: Arc<MessageQueue<Event>>,
    workers: TaskTracker,
    abort_handles: Mutex<Vec<AbortHandle>>,
    peer_addr: OnceLock<SocketAddr>,
}

impl Connection {
    pub(crate) fn new(
        id: ConnectionId,
        role: Role,
        config: Config,
        events: Arc<MessageQueue<Event>>,
    ) -> Self {
        Self {
            id,
            role,
            config,
            lifecycle: Mutex::new(Lifecycle::default()),
            cancel: CancellationToken::new(),
            outgoing: MessageQueue::new(),
            events,
            workers: TaskTracker::new(),
            abort_handles: Mutex::new(Vec::new()),
            peer_addr: OnceLock::new(),
        }
    }

    pub(crate) fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) fn role(&self) -> Role {
        self.role
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn outgoing(&self) -> &MessageQueue<Bytes> {
        &self.outgoing
    }

    pub(crate) fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr.get().copied()
    }

    pub(crate) fn set_peer_addr(&self, addr: SocketAddr) {
        let _ = self.peer_addr.set(addr);
    }

    // Every mutation of `Lifecycle` is a single assignment or push, so a
    // poisoned lock still holds a consistent value.
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.lifecycle().state
    }

    /// `Idle → Connecting`. Returns `false` from any other state.
    pub(crate) fn begin_connecting(&self) -> bool {
        let mut lifecycle = self.lifecycle();
        if lifecycle.state != ConnectionState::Idle {
            return false;
        }
        lifecycle.state = ConnectionState::Connecting;
        true
    }

    /// `Connecting → Connected`, emitting `Connected`.
    ///
    /// Returns `false` if teardown started first; the caller must then stop
    /// without touching the socket further.
    pub(crate) fn mark_connected(&self) -> bool {
        let mut lifecycle = self.lifecycle();
        if lifecycle.state != ConnectionState::Connecting || self.cancel.is_cancelled() {
            return false;
        }
        lifecycle.state = ConnectionState::Connected;
        lifecycle.established = true;
        self.events.push(Event::Connected { id: self.id });
        true
    }

    /// Move to `Disconnecting` unless already further along. Returns the
    /// state observed before the transition.
    fn begin_teardown(&self) -> ConnectionState {
        let mut lifecycle = self.lifecycle();
        let previous = lifecycle.state;
        if previous < ConnectionState::Disconnecting {
            lifecycle.state = ConnectionState::Disconnecting;
        }
        previous
    }

    /// Queue a payload for the send worker.
    ///
    /// Rejects the payload if the connection is not established, if it is
    /// empty, or if it exceeds `max_message_size`. The push happens under the
    /// lifecycle lock, so no payload is accepted once teardown has begun.
    pub(crate) fn send(&self, payload: Bytes) -> bool {
        if payload.is_empty() {
            warn!(id = self.id, "send rejected: empty message");
            return false;
        }
        if let Err(e) = self.config.check_message_size(payload.len()) {
            warn!(id = self.id, error = %e, "send rejected");
            return false;
        }

        let lifecycle = self.lifecycle();
        if !lifecycle.state.can_send() || self.is_cancelled() {
            warn!(id = self.id, state = %lifecycle.state, "send rejected: not connected");
            return false;
        }
        self.outgoing.push(payload);
        true
    }

    pub(crate) fn emit(&self, event: Event) {
        self.events.push(event);
    }

    /// Request teardown: record `reason` unless one is already recorded, then
    /// cancel every worker of this connection.
    pub(crate) fn abort(&self, reason: DisconnectReason) {
        {
            let mut lifecycle = self.lifecycle();
            if lifecycle.close_reason.is_none() {
                lifecycle.close_reason = Some(reason);
            }
        }
        self.cancel.cancel();
    }

    pub(crate) fn close_reason(&self) -> Option<DisconnectReason> {
        self.lifecycle().close_reason.clone()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Emit the terminal `Disconnected` event (at most once) and move to
    /// `Closed`.
    ///
    /// Both happen under the lifecycle lock, so anyone who observes the
    /// event also observes `Closed`. The reason's `connected` flag is set
    /// from whether this attempt ever reached `Connected`.
    pub(crate) fn finish(&self, mut reason: DisconnectReason) {
        let mut lifecycle = self.lifecycle();
        if !lifecycle.disconnect_emitted {
            lifecycle.disconnect_emitted = true;
            reason.connected = lifecycle.established;
            debug!(id = self.id, %reason, "disconnected");
            self.events.push(Event::Disconnected {
                id: self.id,
                reason,
            });
        }
        lifecycle.state = ConnectionState::Closed;
    }

    /// Spawn a worker task tracked by this connection.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn spawn_worker<F>(&self, worker: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = self.workers.spawn(worker);
        self.abort_handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handle.abort_handle());
        handle
    }

    /// Wait until every worker has exited, aborting them after the join
    /// grace period.
    async fn join_workers(&self) {
        self.workers.close();
        let grace = self.config.join_timeout;
        if tokio::time::timeout(grace, self.workers.wait()).await.is_ok() {
            return;
        }

        warn!(
            id = self.id,
            ?grace,
            "workers did not exit within grace period, aborting"
        );
        let handles: Vec<AbortHandle> = self
            .abort_handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for handle in handles {
            handle.abort();
        }
        self.workers.wait().await;
    }

    /// Tear the connection down and wait for all workers to exit.
    ///
    /// Safe to call from any state and any number of times. When it returns,
    /// no worker of this connection is running, the outgoing queue is empty
    /// and exactly one `Disconnected` event has been emitted for the attempt
    /// (none if the connection never left `Idle`).
    pub(crate) async fn shutdown(&self) {
        let previous = self.begin_teardown();
        match previous {
            ConnectionState::Idle => {
                self.cancel.cancel();
                self.join_workers().await;
                self.lifecycle().state = ConnectionState::Closed;
                return;
            }
            ConnectionState::Connecting => self.abort(DisconnectReason::cancelled()),
            ConnectionState::Connected | ConnectionState::Disconnecting => {
                self.abort(DisconnectReason::local_close())
            }
            ConnectionState::Closed => {
                // The session may still be returning from its own teardown.
                self.join_workers().await;
                return;
            }
        }
        debug!(id = self.id, %previous, "tearing down connection");

        self.join_workers().await;
        self.outgoing.clear();

        let reason = self
            .close_reason()
            .unwrap_or_else(DisconnectReason::local_close);
        self.finish(reason);
    }
}

//! Per-connection worker tasks.
//!
//! Each connection runs at most three workers:
//!
//! - **connect** (client only): resolves and connects, then becomes the
//!   session for the new stream
//! - **receive**: reads frames into the event queue and owns the terminal
//!   `Disconnected` event
//! - **send**: drains the outgoing queue onto the socket
//!
//! All of them observe the connection's cancellation token at every await
//! point, so teardown only has to cancel and join.

pub(crate) mod connect;
mod receive;
mod send;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, instrument, warn};

use crate::connection::Connection;
use crate::event::DisconnectReason;

/// Wait for `handle` to finish, aborting it after `grace`.
pub(crate) async fn join_worker(mut handle: JoinHandle<()>, grace: Duration, worker: &'static str) {
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) if e.is_panic() => warn!(worker, "worker panicked"),
        Ok(Err(_)) => {}
        Err(_) => {
            warn!(worker, ?grace, "worker did not exit in time, aborting");
            handle.abort();
            if let Err(e) = handle.await {
                if e.is_panic() {
                    warn!(worker, "worker panicked");
                }
            }
        }
    }
}

/// Drive an established stream until the connection ends.
///
/// Applies socket options, emits `Connected`, starts the send worker, and
/// runs the receive loop on the current task. On exit the send worker has
/// been joined, both socket halves are dropped, and `Disconnected` has been
/// emitted.
#[instrument(name = "session", skip_all, fields(id = conn.id(), role = %conn.role()))]
pub(crate) async fn run_session(conn: Arc<Connection>, stream: TcpStream) {
    if let Err(e) = stream.set_nodelay(conn.config().no_delay) {
        warn!(error = %e, "failed to set TCP_NODELAY");
    }

    if !conn.mark_connected() {
        debug!("teardown requested before handoff");
        let reason = conn
            .close_reason()
            .unwrap_or_else(DisconnectReason::cancelled);
        conn.finish(reason);
        return;
    }
    debug!(peer = ?stream.peer_addr().ok(), "connected");

    let (reader, writer) = stream.into_split();
    let send_worker =
        conn.spawn_worker(send::send_loop(conn.clone(), writer).instrument(Span::current()));

    let reason = receive::receive_loop(&conn, reader).await;

    // Stop the send worker; once it is joined the write half is gone too and
    // the socket is closed.
    conn.abort(reason.clone());
    join_worker(send_worker, conn.config().join_timeout, "send").await;
    conn.outgoing().clear();

    let reason = conn.close_reason().unwrap_or(reason);
    conn.finish(reason);
}

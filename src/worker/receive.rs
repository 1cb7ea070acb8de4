use tokio::net::tcp::OwnedReadHalf;
use tracing::{debug, trace, warn};

use crate::codec;
use crate::connection::Connection;
use crate::event::{DisconnectReason, Event};

/// Read frames into the event queue until the connection ends.
///
/// Returns why it ended. The read half is dropped on return.
pub(super) async fn receive_loop(
    conn: &Connection,
    mut reader: OwnedReadHalf,
) -> DisconnectReason {
    let id = conn.id();
    let max_size = conn.config().max_message_size;

    loop {
        let frame = tokio::select! {
            biased;
            _ = conn.cancelled() => {
                debug!("receive loop cancelled");
                return conn
                    .close_reason()
                    .unwrap_or_else(DisconnectReason::local_close);
            }
            frame = codec::read_frame(&mut reader, max_size) => frame,
        };

        match frame {
            Ok(Some(payload)) => {
                trace!(len = payload.len(), "received frame");
                conn.emit(Event::Data { id, payload });
            }
            Ok(None) => {
                debug!("stream closed by peer");
                return DisconnectReason::closed();
            }
            Err(e) if e.is_protocol_violation() => {
                warn!(error = %e, "protocol violation, closing connection");
                return DisconnectReason::from(&e);
            }
            Err(e) => {
                debug!(error = %e, "receive failed");
                return DisconnectReason::from(&e);
            }
        }
    }
}

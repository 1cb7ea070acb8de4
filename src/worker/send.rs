use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tracing::{debug, trace, warn};

use crate::codec;
use crate::connection::Connection;
use crate::error::Error;
use crate::event::{DisconnectReason, ReasonCode};

/// Drain the outgoing queue onto the socket until cancelled.
///
/// Never emits `Disconnected` itself. On a failed or timed out write it
/// records the reason and cancels the connection; the receive side then
/// reports it.
pub(super) async fn send_loop(conn: Arc<Connection>, mut writer: OwnedWriteHalf) {
    let send_timeout = conn.config().send_timeout;
    let mut buf = BytesMut::new();

    loop {
        let batch = tokio::select! {
            biased;
            _ = conn.cancelled() => break,
            batch = conn.outgoing().drain_wait() => batch,
        };

        buf.clear();
        for payload in &batch {
            if let Err(e) = codec::encode_frame(payload, &mut buf) {
                warn!(error = %e, "failed to encode frame");
                conn.abort(DisconnectReason::from(&e));
                return;
            }
        }

        let write = async {
            writer.write_all(&buf).await?;
            writer.flush().await
        };
        let result = tokio::select! {
            biased;
            _ = conn.cancelled() => break,
            result = tokio::time::timeout(send_timeout, write) => result,
        };

        match result {
            Ok(Ok(())) => trace!(frames = batch.len(), bytes = buf.len(), "sent batch"),
            Ok(Err(e)) => {
                let err = Error::from(e);
                warn!(error = %err, "send failed");
                conn.abort(DisconnectReason::from(&err));
                return;
            }
            Err(_) => {
                warn!(timeout = ?send_timeout, "send timed out");
                conn.abort(DisconnectReason::new(
                    ReasonCode::TimedOut,
                    format!("send did not complete within {send_timeout:?}"),
                ));
                return;
            }
        }
    }

    debug!("send loop stopped");
}

//! Outbound connect: resolution, address selection and cancellable connect.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::{TcpSocket, TcpStream};
use tokio::time::MissedTickBehavior;
use tracing::{debug, instrument, trace};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::event::DisconnectReason;

/// Resolve, connect and then run the session for the new stream.
///
/// Any failure before the handoff, including cancellation, ends in exactly
/// one `Disconnected` event.
#[instrument(name = "connect", skip_all, fields(id = conn.id(), %host, port))]
pub(crate) async fn connect_worker(conn: Arc<Connection>, host: String, port: u16) {
    match connect(&conn, &host, port).await {
        Ok(stream) => super::run_session(conn, stream).await,
        Err(e) => {
            let reason = match e {
                Error::Cancelled => conn
                    .close_reason()
                    .unwrap_or_else(DisconnectReason::cancelled),
                ref other => {
                    debug!(error = %other, "connect failed");
                    DisconnectReason::from(other)
                }
            };
            conn.finish(reason);
        }
    }
}

/// Connect to `host:port`, giving up on cancellation or when the connect
/// timeout elapses.
///
/// Resolution and connect run as one future raced against the cancellation
/// token. Dropping it closes the half-open socket.
async fn connect(conn: &Connection, host: &str, port: u16) -> Result<TcpStream> {
    let config = conn.config();
    let started = Instant::now();

    let attempt = async {
        let addr = resolve(host, port).await?;
        debug!(%addr, "resolved");
        let socket = if addr.is_ipv6() {
            TcpSocket::new_v6()?
        } else {
            TcpSocket::new_v4()?
        };
        Ok::<_, Error>(socket.connect(addr).await?)
    };
    tokio::pin!(attempt);

    let period = config.connect_poll_interval.max(Duration::from_millis(1));
    let mut poll = tokio::time::interval(period);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = conn.cancelled() => return Err(Error::Cancelled),
            result = &mut attempt => return result,
            _ = poll.tick() => {
                if let Some(limit) = config.connect_timeout {
                    if started.elapsed() >= limit {
                        return Err(Error::ConnectTimeout(limit));
                    }
                }
                trace!(elapsed = ?started.elapsed(), "connect pending");
            }
        }
    }
}

/// Resolve `host` and pick the address to connect to.
pub(crate) async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| Error::Resolve(format!("{host}: {e}")))?
        .collect();

    select_address(&addrs, ipv6_supported())
        .ok_or_else(|| Error::Resolve(format!("{host}: no usable address")))
}

/// Pick one address, preferring IPv6 when the host supports it.
///
/// Only one address is ever tried; there is no fallback to the next
/// candidate if the chosen one turns out unreachable.
pub(crate) fn select_address(addrs: &[SocketAddr], ipv6: bool) -> Option<SocketAddr> {
    if ipv6 {
        addrs
            .iter()
            .find(|a| a.is_ipv6())
            .or_else(|| addrs.iter().find(|a| a.is_ipv4()))
            .copied()
    } else {
        addrs.iter().find(|a| a.is_ipv4()).copied()
    }
}

fn ipv6_supported() -> bool {
    TcpSocket::new_v6().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs() -> Vec<SocketAddr> {
        vec![
            "127.0.0.1:80".parse().unwrap(),
            "[::1]:80".parse().unwrap(),
        ]
    }

    #[test]
    fn test_prefers_ipv6_when_supported() {
        let chosen = select_address(&addrs(), true).unwrap();
        assert!(chosen.is_ipv6());
    }

    #[test]
    fn test_ipv4_without_ipv6_support() {
        let chosen = select_address(&addrs(), false).unwrap();
        assert!(chosen.is_ipv4());
    }

    #[test]
    fn test_falls_back_to_ipv4_family() {
        let v4_only: Vec<SocketAddr> = vec!["10.0.0.1:9".parse().unwrap()];
        assert_eq!(select_address(&v4_only, true), Some(v4_only[0]));
    }

    #[test]
    fn test_ipv6_only_without_support_is_unusable() {
        let v6_only: Vec<SocketAddr> = vec!["[::1]:9".parse().unwrap()];
        assert_eq!(select_address(&v6_only, false), None);
        assert_eq!(select_address(&[], true), None);
    }

    #[tokio::test]
    async fn test_resolve_ip_literal() {
        let addr = resolve("127.0.0.1", 4242).await.unwrap();
        assert_eq!(addr, "127.0.0.1:4242".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_invalid_host() {
        let result = resolve("invalid host name with spaces", 1).await;
        assert!(matches!(result, Err(Error::Resolve(_))));
    }
}

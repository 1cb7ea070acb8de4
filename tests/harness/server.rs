//! Test servers: a raw single-connection peer and an echo server.

use std::net::SocketAddr;
use std::sync::Arc;

use tcpwire::{Config, Event, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use super::WAIT;

/// Listener that accepts one connection and lets the test write arbitrary
/// bytes to it.
pub struct RawPeer {
    listener: TcpListener,
    pub addr: SocketAddr,
}

impl RawPeer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        Self { listener, addr }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub async fn accept(&self) -> TcpStream {
        let (stream, _) = tokio::time::timeout(WAIT, self.listener.accept())
            .await
            .expect("timed out waiting for connection")
            .unwrap();
        stream
    }
}

/// Write one well-formed frame.
pub async fn write_raw_frame(stream: &mut TcpStream, payload: &[u8]) {
    stream
        .write_all(&(payload.len() as u32).to_be_bytes())
        .await
        .unwrap();
    stream.write_all(payload).await.unwrap();
    stream.flush().await.unwrap();
}

/// Read one frame, or `None` at end of stream.
pub async fn read_raw_frame(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut header = [0u8; 4];
    if stream.read_exact(&mut header).await.is_err() {
        return None;
    }
    let len = u32::from_be_bytes(header) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.ok()?;
    Some(payload)
}

/// A [`Server`] whose event loop echoes every `Data` payload back to its
/// sender. Other events are recorded for inspection.
pub struct EchoServer {
    pub server: Arc<Server>,
    pub addr: SocketAddr,
    task: JoinHandle<Vec<Event>>,
}

impl EchoServer {
    pub async fn spawn() -> Self {
        Self::spawn_with(Config::default()).await
    }

    pub async fn spawn_with(config: Config) -> Self {
        let server = Arc::new(Server::new(config));
        let addr = server.start("127.0.0.1:0").await.unwrap();

        let task = {
            let server = server.clone();
            tokio::spawn(async move {
                let mut seen = Vec::new();
                while server.is_active() || server.pending_events() > 0 {
                    let event = tokio::select! {
                        event = server.next_event() => event,
                        _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => continue,
                    };
                    if let Event::Data { id, payload } = &event {
                        server.send(*id, payload.clone());
                    }
                    seen.push(event);
                }
                seen
            })
        };

        Self { server, addr, task }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stop the server and return every event it saw, in order.
    pub async fn shutdown(self) -> Vec<Event> {
        self.server.stop().await;
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("echo loop did not stop")
            .unwrap()
    }
}

//! Raw TCP client speaking the wire format by hand.

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::WAIT;
use super::server::{read_raw_frame, write_raw_frame};

pub struct RawClient {
    pub stream: TcpStream,
}

impl RawClient {
    pub async fn connect(addr: SocketAddr) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, payload: &[u8]) {
        write_raw_frame(&mut self.stream, payload).await;
    }

    /// Next frame within [`WAIT`], or `None` once the server closed.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        tokio::time::timeout(WAIT, read_raw_frame(&mut self.stream))
            .await
            .expect("timed out waiting for frame")
    }

    /// Write bytes that are not necessarily a valid frame.
    pub async fn send_bytes(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
    }
}

//! Simple echo server.
//!
//! Run with: cargo run --example echo_server
//! Then connect with: cargo run --example client

use std::error::Error;

use tcpwire::{Config, Event, Server};

const ADDR: &str = "127.0.0.1:9001";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let server = Server::new(Config::default());
    let addr = server.start(ADDR).await?;
    println!("Echo server listening on {addr}");

    loop {
        let event = tokio::select! {
            event = server.next_event() => event,
            _ = tokio::signal::ctrl_c() => break,
        };

        match event {
            Event::PreConnect { id, origin } => println!("[{id}] incoming from {origin}"),
            Event::Connected { id } => println!("[{id}] connected"),
            Event::Data { id, payload } => {
                println!("[{id}] received {} bytes", payload.len());
                if !server.send(id, payload) {
                    eprintln!("[{id}] echo rejected");
                }
            }
            Event::Disconnected { id, reason } => println!("[{id}] disconnected: {reason}"),
            other => println!("{other:?}"),
        }
    }

    println!("Shutting down ({} open connections)", server.connection_count());
    server.stop().await;
    Ok(())
}

//! Simple client that sends a few messages and prints the echoes.
//!
//! Run the echo server first: cargo run --example echo_server
//! Then run: cargo run --example client

use std::error::Error;
use std::time::Duration;

use tcpwire::{Client, Config, Event};

const HOST: &str = "127.0.0.1";
const PORT: u16 = 9001;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = Client::new(Config::default().with_connect_timeout(Some(Duration::from_secs(5))));
    println!("Connecting to {HOST}:{PORT}");
    if !client.connect(HOST, PORT) {
        return Err("connect rejected".into());
    }

    let messages = ["Hello", "from", "tcpwire"];
    let mut echoed = 0;

    while echoed < messages.len() {
        match client.next_event().await {
            Event::Connected { .. } => {
                println!("Connected");
                for msg in messages {
                    println!("Sending: {msg}");
                    client.send(msg);
                }
            }
            Event::Data { payload, .. } => {
                println!("Received: {}", String::from_utf8_lossy(&payload));
                echoed += 1;
            }
            Event::Disconnected { reason, .. } => {
                return Err(format!("disconnected: {reason}").into());
            }
            _ => {}
        }
    }

    println!("Closing connection...");
    client.disconnect().await;
    for event in client.drain_events() {
        println!("{event:?}");
    }

    println!("Done");
    Ok(())
}

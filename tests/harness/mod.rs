//! Test harness utilities for transport integration tests.
//!
//! Raw TCP peers that speak the wire format by hand, an echo server built on
//! [`tcpwire::Server`], and helpers for waiting on events with a deadline.

#![allow(dead_code)]

mod client;
mod metrics;
mod server;

pub use client::RawClient;
pub use metrics::Metrics;
pub use server::{EchoServer, RawPeer, read_raw_frame, write_raw_frame};

use std::time::Duration;

use tcpwire::{Client, Event, Server};

/// Upper bound for any single wait in the tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Install a fmt subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Anything that hands out events.
pub trait EventSource {
    fn next_event(&self) -> impl std::future::Future<Output = Event> + Send;
}

impl EventSource for Client {
    fn next_event(&self) -> impl std::future::Future<Output = Event> + Send {
        Client::next_event(self)
    }
}

impl EventSource for Server {
    fn next_event(&self) -> impl std::future::Future<Output = Event> + Send {
        Server::next_event(self)
    }
}

/// Next event, failing the test if none arrives within [`WAIT`].
pub async fn next_event<S: EventSource>(source: &S) -> Event {
    tokio::time::timeout(WAIT, source.next_event())
        .await
        .expect("timed out waiting for event")
}

/// Collect events until (and including) the first `Disconnected`.
pub async fn events_until_disconnected<S: EventSource>(source: &S) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        let event = next_event(source).await;
        let done = event.is_disconnected();
        events.push(event);
        if done {
            return events;
        }
    }
}

/// Wait for the client to report `Connected`, failing on anything else.
pub async fn expect_connected(client: &Client) {
    match next_event(client).await {
        Event::Connected { .. } => {}
        other => panic!("expected Connected, got {other:?}"),
    }
}

/// Assert nothing else shows up within `quiet`.
pub async fn expect_silence<S: EventSource>(source: &S, quiet: Duration) {
    if let Ok(event) = tokio::time::timeout(quiet, source.next_event()).await {
        panic!("unexpected event: {event:?}");
    }
}

/// Count `Disconnected` events.
pub fn disconnects(events: &[Event]) -> usize {
    events.iter().filter(|e| e.is_disconnected()).count()
}

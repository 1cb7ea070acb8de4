//! Atomic counters for stress runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Counters {
    connections: AtomicUsize,
    connections_failed: AtomicUsize,
    messages_sent: AtomicUsize,
    messages_received: AtomicUsize,
    errors: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct Metrics(Arc<Counters>);

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connection(&self) {
        self.0.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_failed(&self) {
        self.0.connections_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_sent(&self) {
        self.0.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_received(&self) {
        self.0.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.0.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connections_total(&self) -> usize {
        self.0.connections.load(Ordering::Relaxed)
    }

    pub fn connections_failed(&self) -> usize {
        self.0.connections_failed.load(Ordering::Relaxed)
    }

    pub fn messages_sent(&self) -> usize {
        self.0.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> usize {
        self.0.messages_received.load(Ordering::Relaxed)
    }

    pub fn report(&self) {
        println!(
            "connections: {} ok / {} failed, messages: {} sent / {} received, errors: {}",
            self.connections_total(),
            self.connections_failed(),
            self.messages_sent(),
            self.messages_received(),
            self.0.errors.load(Ordering::Relaxed),
        );
    }
}

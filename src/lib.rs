//! # tcpwire - Length-prefixed message transport over TCP
//!
//! `tcpwire` moves discrete messages over TCP. Every message travels as a
//! 4-byte big-endian length followed by the payload. Networking runs on
//! background Tokio tasks; the application drives everything through a
//! non-blocking façade and observes the outcome as a stream of [`Event`]s.
//!
//! ## Features
//!
//! - **Client and server endpoints** sharing one connection lifecycle
//! - **Exactly one `Disconnected`** event per connection attempt, with a reason
//! - **Cancellable connect** that reacts to `disconnect` promptly
//! - **Bounded teardown**: workers are joined, and aborted if they linger
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tcpwire::{Client, Config, Event, Server};
//!
//! let server = Server::new(Config::default());
//! let addr = server.start("127.0.0.1:0").await?;
//!
//! let client = Client::new(Config::default());
//! client.connect("127.0.0.1", addr.port());
//! while !matches!(client.next_event().await, Event::Connected { .. }) {}
//! client.send(&b"ping"[..]);
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod queue;
pub mod server;

mod worker;

pub use client::{CLIENT_CONNECTION_ID, Client};
pub use config::Config;
pub use connection::{ConnectionState, Role};
pub use error::{Error, Result};
pub use event::{ConnectionId, DisconnectReason, Event, ReasonCode};
pub use queue::MessageQueue;
pub use server::Server;

//! Per-connection state shared between the façade and the workers.
//!
//! ## Connection Lifecycle
//!
//! 1. **Idle** - created, nothing started
//! 2. **Connecting** - connect worker resolving and connecting (or accept
//!    handoff on the server)
//! 3. **Connected** - send and receive workers running
//! 4. **Disconnecting** - teardown in progress
//! 5. **Closed** - all workers exited, `Disconnected` emitted
//!
//! A fresh connection object is created for every attempt; a closed one is
//! never reused.

mod role;
mod state;

pub use role::Role;
pub use state::ConnectionState;

#[allow(clippy::module_inception)]
mod connection;

pub(crate) use connection::Connection;

//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! EndpointAddress (host/port from config)
//!     → endpoint.rs (wildcard default, tcp:// URI check)
//!     → listener.rs (bind once, stream accepted connections)
//!     → gRPC dispatch loop
//! ```
//!
//! # Design Decisions
//! - Binding happens before the dispatch task is spawned, so bind errors
//!   surface to the caller of `start`
//! - The accept stream owns the socket; ending the stream closes it

pub mod endpoint;
pub mod listener;

pub use endpoint::EndpointAddress;
pub use listener::{Listener, ListenerError};

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Start (manager.rs):
//!     Created → bind listener → spawn dispatch task → Running
//!
//! Serve (dispatch.rs):
//!     accepted socket → HTTP/2 connection task → gRPC routes
//!
//! Stop (manager.rs + shutdown.rs):
//!     Trigger → listener closed → drain in-flight RPCs (optional deadline) → Stopped
//!     Deadline hit → dispatch loop aborted → connections and RPCs cancelled
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → process driver calls stop
//!
//! Events (event.rs):
//!     every step → EventSink
//! ```
//!
//! # Design Decisions
//! - Fail fast: bind errors are returned, never retried
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has an optional deadline: abandon the drain after it

mod dispatch;
pub mod event;
pub mod manager;
pub mod shutdown;
pub mod signals;

pub use event::{EventSink, LifecycleEvent, NoopSink};
pub use manager::{LifecycleError, LifecycleManager, LifecycleState};
pub use shutdown::Shutdown;

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! LifecycleManager / App
//!     → events.rs (LifecycleEvent → structured log record + counter)
//!     → logging.rs (subscriber: JSON or pretty, level filter)
//!     → metrics.rs (optional Prometheus endpoint)
//! ```
//!
//! # Design Decisions
//! - One subscriber per process, installed by `main`
//! - The event logger holds no state and never fails

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::TracingEventLogger;

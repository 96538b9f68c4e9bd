//! gRPC application bootstrap.
//!
//! Loads configuration, initializes structured logging, and runs a gRPC
//! server (an echo service plus server reflection) under a lifecycle manager
//! that binds once, serves on a spawned task, and drains gracefully on stop.
//!
//! # Architecture Overview
//!
//! ```text
//!   config ──▶ observability::logging ──▶ app::App::bootstrap
//!                                               │
//!                                               ▼
//!                              lifecycle::LifecycleManager ──events──▶ observability::events
//!                                 │            │
//!                          net::Listener   hello::v1::HelloService
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod hello;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use app::App;
pub use config::AppConfig;
pub use error::{Error, Result};
pub use lifecycle::{LifecycleManager, Shutdown};

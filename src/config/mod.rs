//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (0.0.0.0:8888)
//!     → config file (YAML/TOML)
//!     → environment overrides (PREFIX_APP_SERVER_PORT, ...)
//!     → validation.rs (semantic checks, all errors at once)
//!     → AppConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is read once at boot; there is no reload
//! - A validation failure stops the process before anything is bound

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{default_config_path, load_config, ConfigError, ConfigLoader, ENV_PREFIX};
pub use schema::{AppConfig, LoggingConfig, ObservabilityConfig, ServerConfig};
pub use validation::ValidationError;

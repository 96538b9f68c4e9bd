//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the process-wide `tracing` subscriber exactly once
//! - Map the configured level to filter directives
//!
//! # Design Decisions
//! - JSON format for production, pretty format for local development
//! - `RUST_LOG` overrides the configured level when set

use std::str::FromStr;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Error type for logging setup.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("unknown log level {0:?}")]
    UnknownLevel(String),

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Parse a level name.
///
/// Accepts the `tracing` names plus `fatal`/`panic` (mapped to `error`) and
/// `disabled` (mapped to `off`), case-insensitively.
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "fatal" | "panic" => Some(LevelFilter::ERROR),
        "disabled" => Some(LevelFilter::OFF),
        "" => None,
        other => LevelFilter::from_str(other).ok(),
    }
}

/// Filter directives for `level`: this crate and the gRPC trace layer at the
/// configured level, dependencies at `warn`.
pub fn directives(level: LevelFilter) -> String {
    let level = level.to_string().to_ascii_lowercase();
    format!("warn,grpc_bootstrap={level},tower_http={level}")
}

/// Install the global subscriber.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let level = parse_level(&config.level)
        .ok_or_else(|| LoggingError::UnknownLevel(config.level.clone()))?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directives(level))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.local {
        registry.with(tracing_subscriber::fmt::layer().pretty()).try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .try_init()?;
    }

    tracing::info!(level = %level, local = config.local, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_aliases() {
        assert_eq!(parse_level("INFO"), Some(LevelFilter::INFO));
        assert_eq!(parse_level("trace"), Some(LevelFilter::TRACE));
        assert_eq!(parse_level("fatal"), Some(LevelFilter::ERROR));
        assert_eq!(parse_level("disabled"), Some(LevelFilter::OFF));
        assert_eq!(parse_level("loud"), None);
        assert_eq!(parse_level(""), None);
    }

    #[test]
    fn test_directives_parse() {
        let directives = directives(LevelFilter::DEBUG);
        assert_eq!(directives, "warn,grpc_bootstrap=debug,tower_http=debug");
        assert!(EnvFilter::try_new(directives).is_ok());
    }
}

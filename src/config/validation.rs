//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port present and in range)
//! - Check the log level and metrics address parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use crate::config::schema::AppConfig;
use crate::observability::logging::parse_level;

/// One rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} {message}")]
pub struct ValidationError {
    /// Dotted key of the offending value.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a loaded configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let server = &config.app.server;

    match server.port {
        None => errors.push(ValidationError::new("app.server.port", "is required")),
        Some(0) => errors.push(ValidationError::new("app.server.port", "must be non-zero")),
        Some(port) if port > u32::from(u16::MAX) => errors.push(ValidationError::new(
            "app.server.port",
            format!("{port} is out of range (1-65535)"),
        )),
        Some(_) => {}
    }

    if server.host.chars().any(char::is_whitespace) {
        errors.push(ValidationError::new(
            "app.server.host",
            format!("{:?} contains whitespace", server.host),
        ));
    }

    if parse_level(&config.app.logging.level).is_none() {
        errors.push(ValidationError::new(
            "app.logging.level",
            format!("{:?} is not a known level", config.app.logging.level),
        ));
    }

    if let Some(address) = &config.app.observability.metrics_address {
        if address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "app.observability.metrics_address",
                format!("{address:?} is not a socket address"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        let mut config = AppConfig::default();
        config.app.server.port = Some(8888);
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_missing_port_is_rejected() {
        let errors = validate_config(&AppConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::new("app.server.port", "is required")]);
    }

    #[test]
    fn test_zero_port_is_rejected() {
        let mut config = valid();
        config.app.server.port = Some(0);
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "app.server.port");
    }

    #[test]
    fn test_all_errors_are_reported() {
        let mut config = valid();
        config.app.server.port = Some(70_000);
        config.app.logging.level = "chatty".into();
        config.app.observability.metrics_address = Some("nowhere".into());

        let fields: Vec<_> = validate_config(&config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                "app.server.port",
                "app.logging.level",
                "app.observability.metrics_address"
            ]
        );
    }
}

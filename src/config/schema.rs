//! Configuration schema definitions.
//!
//! Mirrors the YAML layout:
//!
//! ```yaml
//! app:
//!   server:   { host, port, shutdown_timeout_secs }
//!   logging:  { level, local }
//!   observability: { metrics_address }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::net::EndpointAddress;

/// Root configuration document.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub app: App,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct App {
    /// gRPC listener settings.
    pub server: ServerConfig,

    pub logging: LoggingConfig,

    pub observability: ObservabilityConfig,
}

/// gRPC server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind. Empty means all interfaces.
    pub host: String,

    /// Port to bind. Required; wide type so out-of-range values reach
    /// validation instead of failing deserialization.
    pub port: Option<u32>,

    /// Drain deadline on shutdown. `0` waits indefinitely.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: None,
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// The listen endpoint. Only meaningful on a validated config.
    pub fn endpoint(&self) -> EndpointAddress {
        let port = self
            .port
            .and_then(|port| u16::try_from(port).ok())
            .unwrap_or(0);
        EndpointAddress::new(self.host.clone(), port)
    }

    pub fn shutdown_deadline(&self) -> Option<Duration> {
        match self.shutdown_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error, off).
    pub level: String,

    /// Human-readable console output instead of JSON.
    pub local: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            local: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Prometheus scrape address; the exporter is off when unset.
    pub metrics_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_and_deadline() {
        let server = ServerConfig {
            host: "127.0.0.1".into(),
            port: Some(9000),
            shutdown_timeout_secs: 0,
        };
        assert_eq!(server.endpoint(), EndpointAddress::new("127.0.0.1", 9000));
        assert_eq!(server.shutdown_deadline(), None);
        assert_eq!(
            ServerConfig::default().shutdown_deadline(),
            Some(Duration::from_secs(30))
        );
    }
}

//! Endpoint address resolution.

use std::fmt;

use url::Url;

use crate::net::listener::ListenerError;

/// Host used when none is configured.
pub const WILDCARD_HOST: &str = "0.0.0.0";

/// Port used when neither the file nor the environment supplies one.
pub const DEFAULT_PORT: u16 = 8888;

/// A host/port pair the server listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointAddress {
    /// Hostname or IP literal. Empty means the wildcard address.
    pub host: String,
    pub port: u16,
}

impl EndpointAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The configured host, or [`WILDCARD_HOST`] when empty.
    pub fn host_or_wildcard(&self) -> &str {
        let host = self.host.trim();
        if host.is_empty() {
            WILDCARD_HOST
        } else {
            host
        }
    }

    /// Render the endpoint as a `tcp://host:port` URI and check it parses.
    pub fn to_uri(&self) -> Result<Url, ListenerError> {
        if self.port == 0 {
            return Err(ListenerError::InvalidAddress {
                address: self.to_string(),
                reason: "port must be between 1 and 65535".to_string(),
            });
        }

        let uri = Url::parse(&self.to_string()).map_err(|e| ListenerError::InvalidAddress {
            address: self.to_string(),
            reason: e.to_string(),
        })?;

        if uri.host_str().map_or(true, str::is_empty) {
            return Err(ListenerError::InvalidAddress {
                address: self.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(uri)
    }
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = self.host_or_wildcard();
        // Bare IPv6 literals need brackets to survive URI parsing.
        if host.contains(':') && !host.starts_with('[') {
            write!(f, "tcp://[{}]:{}", host, self.port)
        } else {
            write!(f, "tcp://{}:{}", host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_host_uses_wildcard() {
        let endpoint = EndpointAddress::new("", 8888);
        assert_eq!(endpoint.host_or_wildcard(), "0.0.0.0");
        assert_eq!(endpoint.to_string(), "tcp://0.0.0.0:8888");
    }

    #[test]
    fn test_uri_round_trips_host_and_port() {
        let uri = EndpointAddress::new("127.0.0.1", 50051).to_uri().unwrap();
        assert_eq!(uri.scheme(), "tcp");
        assert_eq!(uri.host_str(), Some("127.0.0.1"));
        assert_eq!(uri.port(), Some(50051));
    }

    #[test]
    fn test_ipv6_host_is_bracketed() {
        let endpoint = EndpointAddress::new("::1", 9000);
        assert_eq!(endpoint.to_string(), "tcp://[::1]:9000");
        assert!(endpoint.to_uri().is_ok());
    }

    #[test]
    fn test_zero_port_is_rejected() {
        let err = EndpointAddress::new("127.0.0.1", 0).to_uri().unwrap_err();
        assert!(matches!(err, ListenerError::InvalidAddress { .. }));
    }

    #[test]
    fn test_malformed_host_is_rejected() {
        let err = EndpointAddress::new("not a host", 8080).to_uri().unwrap_err();
        assert!(matches!(err, ListenerError::InvalidAddress { .. }));
    }
}

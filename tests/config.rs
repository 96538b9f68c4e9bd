//! Boot-time configuration behaviour.

use std::io::Write;
use std::sync::Arc;

use grpc_bootstrap::config::{ConfigError, ConfigLoader};
use grpc_bootstrap::lifecycle::NoopSink;
use grpc_bootstrap::App;

#[test]
fn test_missing_port_never_reaches_start() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(b"app:\n  server:\n    host: 0.0.0.0\n").unwrap();

    let result = ConfigLoader::new("TEST_PROJ")
        .file(file.path())
        .defaults(false)
        .env(|_| None)
        .load();

    let err = result.unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
    assert!(err.to_string().contains("app.server.port is required"));
}

#[test]
fn test_zero_port_rejected_even_with_defaults() {
    let result = ConfigLoader::new("TEST_PROJ")
        .env(|key| (key == "TEST_PROJ_APP_SERVER_PORT").then(|| "0".to_string()))
        .load();

    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn test_shipped_config_boots() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/grpc-bootstrap/config.yaml");
    let config = ConfigLoader::new("TEST_PROJ")
        .file(path)
        .defaults(false)
        .env(|_| None)
        .load()
        .unwrap();

    assert_eq!(config.app.server.endpoint().to_string(), "tcp://0.0.0.0:8888");
    assert!(App::bootstrap(config, Arc::new(NoopSink)).is_ok());
}

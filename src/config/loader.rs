//! Configuration loading from disk and the environment.
//!
//! Sources are applied in order, later ones winning:
//!
//! 1. built-in defaults (`0.0.0.0:8888`), unless disabled
//! 2. the config file, YAML or TOML by extension
//! 3. environment variables, `PREFIX_` + the dotted key upper-cased with
//!    `.` replaced by `_` (e.g. `GRPC_BOOTSTRAP_APP_SERVER_PORT`)

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::net::endpoint::{DEFAULT_PORT, WILDCARD_HOST};

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "GRPC_BOOTSTRAP";

/// Keys that can be overridden from the environment.
pub const ENV_KEYS: &[&str] = &[
    "app.server.host",
    "app.server.port",
    "app.server.shutdown_timeout_secs",
    "app.logging.level",
    "app.logging.local",
    "app.observability.metrics_address",
];

/// Any non-empty value forces local (human-readable) logging.
const LOCAL_ENV: &str = "LOCAL";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid value {value:?} for {key}: {message}")]
    Env {
        key: String,
        value: String,
        message: String,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builds an [`AppConfig`] from defaults, a file and the environment.
pub struct ConfigLoader {
    env_prefix: String,
    file: Option<PathBuf>,
    file_required: bool,
    defaults: bool,
    env: EnvLookup,
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("env_prefix", &self.env_prefix)
            .field("file", &self.file)
            .field("file_required", &self.file_required)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl ConfigLoader {
    /// A loader reading the process environment with `env_prefix`.
    pub fn new(env_prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: env_prefix.into(),
            file: None,
            file_required: false,
            defaults: true,
            env: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Read `path`; loading fails if it does not exist.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self.file_required = true;
        self
    }

    /// Read `path` if it exists.
    pub fn optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self.file_required = false;
        self
    }

    /// Fill in host and port when no source sets them.
    pub fn defaults(mut self, enabled: bool) -> Self {
        self.defaults = enabled;
        self
    }

    /// Replace the environment lookup.
    pub fn env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    /// Load, merge and validate.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = match &self.file {
            Some(path) if self.file_required || path.exists() => read_file(path)?,
            _ => AppConfig::default(),
        };

        self.apply_env(&mut config)?;

        if self.defaults {
            let server = &mut config.app.server;
            if server.host.trim().is_empty() {
                server.host = WILDCARD_HOST.to_string();
            }
            server.port.get_or_insert(u32::from(DEFAULT_PORT));
        }

        validate_config(&config).map_err(ConfigError::Validation)?;

        Ok(config)
    }

    /// Environment variable name for a dotted `key`.
    pub fn env_var(&self, key: &str) -> String {
        let key = key.replace('.', "_");
        if self.env_prefix.is_empty() {
            key.to_uppercase()
        } else {
            format!("{}_{}", self.env_prefix, key).to_uppercase()
        }
    }

    fn apply_env(&self, config: &mut AppConfig) -> Result<(), ConfigError> {
        for key in ENV_KEYS {
            let var = self.env_var(key);
            if let Some(value) = (self.env)(&var) {
                set_key(config, key, var, value)?;
            }
        }

        if (self.env)(LOCAL_ENV).is_some_and(|value| !value.is_empty()) {
            config.app.logging.local = true;
        }

        Ok(())
    }
}

/// Load and validate a config file with no defaults or environment.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = read_file(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// `config/<binary name>/config.yaml`, relative to the working directory.
pub fn default_config_path() -> PathBuf {
    let binary = std::env::args_os()
        .next()
        .map(PathBuf::from)
        .and_then(|path| path.file_stem().map(|stem| stem.to_os_string()))
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").into());

    Path::new("config").join(binary).join("config.yaml")
}

/// Parse a config file, choosing the format by extension.
fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }

    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
        _ => serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string())),
    }
}

fn set_key(config: &mut AppConfig, key: &str, var: String, value: String) -> Result<(), ConfigError> {
    match key {
        "app.server.host" => config.app.server.host = value,
        "app.server.port" => config.app.server.port = Some(parse_value(var, value)?),
        "app.server.shutdown_timeout_secs" => {
            config.app.server.shutdown_timeout_secs = parse_value(var, value)?;
        }
        "app.logging.level" => config.app.logging.level = value,
        "app.logging.local" => config.app.logging.local = parse_bool(var, value)?,
        "app.observability.metrics_address" => {
            config.app.observability.metrics_address = Some(value).filter(|v| !v.is_empty());
        }
        _ => {}
    }
    Ok(())
}

fn parse_value<T>(key: String, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        key,
        message: e.to_string(),
        value,
    })
}

fn parse_bool(key: String, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Env {
            key,
            value,
            message: "expected a boolean".to_string(),
        }),
    }
}

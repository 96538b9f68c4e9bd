//! Process-level error type.

use crate::config::ConfigError;
use crate::lifecycle::LifecycleError;
use crate::observability::logging::LoggingError;

/// Every error that can end the process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration failed to load or validate. Fatal at boot.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

impl Error {
    /// Whether the process should still exit successfully.
    ///
    /// A drain that hit its deadline has already stopped the server; the
    /// abandoned requests are logged, not treated as a failed shutdown.
    pub fn is_clean_exit(&self) -> bool {
        matches!(self, Error::Lifecycle(LifecycleError::DrainTimeout(_)))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

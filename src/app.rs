//! Process driver.
//!
//! Wires the configured server together by plain constructor calls and runs
//! it until a termination signal arrives or the server dies:
//!
//! ```text
//! AppConfig ─▶ App::bootstrap ─▶ LifecycleManager (+ HelloService, reflection)
//!                                      │
//!                  App::run ─▶ start ─▶ wait(signal | server failure) ─▶ stop(deadline)
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::hello::v1::{HelloService, FILE_DESCRIPTOR_SET};
use crate::lifecycle::{
    EventSink, LifecycleError, LifecycleEvent, LifecycleManager, LifecycleState,
};

/// Component name reported in lifecycle events.
pub const COMPONENT: &str = "grpc";

/// A fully wired, not yet started application.
pub struct App {
    config: AppConfig,
    manager: LifecycleManager,
    sink: Arc<dyn EventSink>,
}

impl App {
    /// Build the manager and register the echo and reflection services.
    pub fn bootstrap(config: AppConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        let manager = LifecycleManager::new(COMPONENT, Arc::clone(&sink));
        manager.register_handler(HelloService.into_server())?;
        manager.enable_reflection(FILE_DESCRIPTOR_SET)?;

        Ok(Self {
            config,
            manager,
            sink,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn manager(&self) -> &LifecycleManager {
        &self.manager
    }

    /// Start serving on the configured endpoint.
    pub async fn start(&self) -> Result<SocketAddr> {
        let endpoint = self.config.app.server.endpoint();
        Ok(self.manager.start(&endpoint).await?)
    }

    /// Start, wait for `signal` or a server failure, then stop.
    ///
    /// `signal` resolves with the name of the signal that asked for shutdown.
    pub async fn run<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = std::io::Result<&'static str>>,
    {
        self.start().await?;
        self.serve_until(signal).await
    }

    /// Wait on a started app for `signal` or a server failure, then stop.
    ///
    /// A server that died on its own is reported as the error even when the
    /// stop that follows succeeds.
    pub async fn serve_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = std::io::Result<&'static str>>,
    {
        let interrupted = tokio::select! {
            received = signal => match received {
                Ok(name) => {
                    self.sink.log_event(&LifecycleEvent::SignalReceived {
                        signal: name.to_string(),
                    });
                    None
                }
                Err(err) => Some(Error::Signal(err)),
            },
            state = self.manager.done() => match state {
                LifecycleState::Failed => Some(Error::from(self.manager.failure().unwrap_or_else(
                    || LifecycleError::DispatchFatal("server failed".to_string()),
                ))),
                _ => None,
            },
        };

        let stopped = self
            .manager
            .stop(self.config.app.server.shutdown_deadline())
            .await
            .map_err(Error::from);

        let outcome = match interrupted {
            Some(err) => Err(err),
            None => stopped,
        };

        self.sink.log_event(&LifecycleEvent::Stopped {
            error: outcome.as_ref().err().map(ToString::to_string),
        });

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::event::NoopSink;

    #[test]
    fn test_bootstrap_registers_services() {
        let mut config = AppConfig::default();
        config.app.server.port = Some(8888);

        let app = App::bootstrap(config, Arc::new(NoopSink)).unwrap();
        assert_eq!(app.manager().state(), LifecycleState::Created);
        assert_eq!(app.manager().name(), COMPONENT);
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_fatal() {
        let mut config = AppConfig::default();
        config.app.server.port = Some(8888);
        let app = App::bootstrap(config, Arc::new(NoopSink)).unwrap();

        app.manager()
            .start_with_incoming(
                futures_util::stream::empty(),
                "127.0.0.1:8888".parse().unwrap(),
            )
            .await
            .unwrap();

        let signal = std::future::pending::<std::io::Result<&'static str>>();
        let err = tokio::time::timeout(std::time::Duration::from_secs(2), app.serve_until(signal))
            .await
            .unwrap()
            .unwrap_err();

        assert!(matches!(err, Error::Lifecycle(LifecycleError::DispatchFatal(_))));
        assert!(!err.is_clean_exit());
    }
}

//! Lifecycle events and the sink that consumes them.

use std::net::SocketAddr;
use std::time::Duration;

/// One observable step of the server lifecycle.
///
/// Events are produced synchronously by the manager and the process driver
/// and handed to an [`EventSink`]. They are not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A component is about to start.
    StartingHook { component: String },
    /// A component started and is serving.
    StartedHook {
        component: String,
        address: SocketAddr,
        runtime: Duration,
    },
    /// A component failed to start, or its dispatch loop died while running.
    StartFailed { component: String, error: String },
    /// A component is about to stop.
    StoppingHook { component: String },
    /// A component finished stopping, possibly with an error.
    StoppedHook {
        component: String,
        runtime: Duration,
        error: Option<String>,
    },
    /// Startup failed and partially acquired resources are being released.
    RollingBack { component: String, error: String },
    /// The whole process finished its stop sequence.
    Stopped { error: Option<String> },
    /// A termination signal arrived.
    SignalReceived { signal: String },
}

impl LifecycleEvent {
    /// Short, stable name used for metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::StartingHook { .. } => "starting",
            LifecycleEvent::StartedHook { .. } => "started",
            LifecycleEvent::StartFailed { .. } => "start_failed",
            LifecycleEvent::StoppingHook { .. } => "stopping",
            LifecycleEvent::StoppedHook { .. } => "stopped_hook",
            LifecycleEvent::RollingBack { .. } => "rolling_back",
            LifecycleEvent::Stopped { .. } => "stopped",
            LifecycleEvent::SignalReceived { .. } => "signal",
        }
    }

    /// The error carried by the event, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            LifecycleEvent::StartFailed { error, .. } | LifecycleEvent::RollingBack { error, .. } => {
                Some(error.as_str())
            }
            LifecycleEvent::StoppedHook { error, .. } | LifecycleEvent::Stopped { error } => {
                error.as_deref()
            }
            _ => None,
        }
    }
}

/// Receiver of lifecycle events.
///
/// Implementations are shared between the manager, its dispatch task and the
/// process driver, so they must be callable concurrently without external
/// locking. `log_event` must not panic and must return promptly; lifecycle
/// progress never waits on it.
pub trait EventSink: Send + Sync {
    fn log_event(&self, event: &LifecycleEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn log_event(&self, _event: &LifecycleEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_accessor() {
        let failed = LifecycleEvent::StartFailed {
            component: "grpc".into(),
            error: "address in use".into(),
        };
        assert_eq!(failed.error(), Some("address in use"));

        let stopped = LifecycleEvent::StoppedHook {
            component: "grpc".into(),
            runtime: Duration::from_millis(3),
            error: None,
        };
        assert_eq!(stopped.error(), None);
        assert_eq!(stopped.kind(), "stopped_hook");
    }
}

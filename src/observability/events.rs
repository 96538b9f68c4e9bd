//! Lifecycle event logging.
//!
//! Adapts [`LifecycleEvent`]s to structured `tracing` records. Every event is
//! also counted in `lifecycle_events_total`.

use crate::lifecycle::event::{EventSink, LifecycleEvent};
use crate::observability::metrics::record_lifecycle_event;

/// [`EventSink`] backed by the global `tracing` subscriber.
///
/// Stateless, so it can be shared freely; the subscriber does its own
/// synchronization.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLogger;

impl EventSink for TracingEventLogger {
    fn log_event(&self, event: &LifecycleEvent) {
        record_lifecycle_event(event.kind());

        match event {
            LifecycleEvent::StartingHook { component } => {
                tracing::info!(component = %component, "Starting component");
            }
            LifecycleEvent::StartedHook {
                component,
                address,
                runtime,
            } => {
                tracing::info!(
                    component = %component,
                    address = %address,
                    runtime = ?runtime,
                    "gRPC server listening"
                );
            }
            LifecycleEvent::StartFailed { component, error } => {
                tracing::error!(component = %component, error = %error, "Component failed");
            }
            LifecycleEvent::StoppingHook { component } => {
                tracing::info!(component = %component, "Stopping component");
            }
            LifecycleEvent::StoppedHook {
                component,
                runtime,
                error: None,
            } => {
                tracing::info!(component = %component, runtime = ?runtime, "Component stopped");
            }
            LifecycleEvent::StoppedHook {
                component,
                runtime,
                error: Some(error),
            } => {
                tracing::error!(
                    component = %component,
                    runtime = ?runtime,
                    error = %error,
                    "Component stopped with error"
                );
            }
            LifecycleEvent::RollingBack { component, error } => {
                tracing::error!(component = %component, error = %error, "Start failed, rolling back");
            }
            LifecycleEvent::Stopped { error: None } => {
                tracing::info!("Stopped");
            }
            LifecycleEvent::Stopped { error: Some(error) } => {
                tracing::error!(error = %error, "Stop failed");
            }
            LifecycleEvent::SignalReceived { signal } => {
                tracing::info!(signal = %signal.to_uppercase(), "Received signal");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_every_event_is_accepted_without_subscriber() {
        let logger = TracingEventLogger;
        let events = [
            LifecycleEvent::StartingHook { component: "grpc".into() },
            LifecycleEvent::StartedHook {
                component: "grpc".into(),
                address: "127.0.0.1:8888".parse().unwrap(),
                runtime: Duration::from_millis(2),
            },
            LifecycleEvent::StoppedHook {
                component: "grpc".into(),
                runtime: Duration::ZERO,
                error: Some("drain failed".into()),
            },
            LifecycleEvent::Stopped { error: None },
            LifecycleEvent::SignalReceived { signal: "sigterm".into() },
        ];

        for event in &events {
            logger.log_event(event);
        }
    }
}

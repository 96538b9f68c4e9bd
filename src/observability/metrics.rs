//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifecycle_events_total` (counter): lifecycle events by `event` kind
//! - `echo_requests_total` (counter): echo RPCs served
//!
//! The Prometheus endpoint is only started when an address is configured.
//! Recording without an installed exporter is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_lifecycle_event(kind: &'static str) {
    ::metrics::counter!("lifecycle_events_total", "event" => kind).increment(1);
}

pub fn record_echo_request() {
    ::metrics::counter!("echo_requests_total").increment(1);
}

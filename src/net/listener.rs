//! TCP listener feeding the gRPC dispatch loop.
//!
//! # Responsibilities
//! - Resolve and bind the configured endpoint
//! - Turn the bound socket into a connection stream for the server
//! - Stop accepting and close the socket once shutdown is triggered

use std::io;
use std::net::SocketAddr;

use futures_util::stream::{self, Stream};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use crate::net::endpoint::EndpointAddress;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The endpoint does not form a usable address.
    #[error("invalid listen address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
}

/// A bound TCP listener that has not started accepting yet.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to the given endpoint.
    pub async fn bind(endpoint: &EndpointAddress) -> Result<Self, ListenerError> {
        let uri = endpoint.to_uri()?;
        let bind_error = |source| ListenerError::Bind {
            address: uri.to_string(),
            source,
        };

        let host = uri
            .host_str()
            .unwrap_or(endpoint.host_or_wildcard())
            .trim_start_matches('[')
            .trim_end_matches(']');
        let port = uri.port().unwrap_or(endpoint.port);

        let inner = TcpListener::bind((host, port)).await.map_err(bind_error)?;
        let local_addr = inner.local_addr().map_err(bind_error)?;

        tracing::info!(
            address = %uri,
            local_addr = %local_addr,
            "Listener bound"
        );

        Ok(Self { inner, local_addr })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Convert into a stream of accepted connections.
    ///
    /// The stream ends, and the socket is closed, as soon as `shutdown`
    /// fires. Accept errors are yielded to the server, which logs and skips
    /// them.
    pub fn into_incoming(
        self,
        shutdown: broadcast::Receiver<()>,
    ) -> impl Stream<Item = io::Result<TcpStream>> + Send + 'static {
        stream::unfold(
            (self.inner, shutdown),
            |(listener, mut shutdown)| async move {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => {
                        tracing::debug!("Listener closed, no longer accepting connections");
                        None
                    }
                    accepted = listener.accept() => {
                        let next = accepted.map(|(stream, peer_addr)| {
                            tracing::debug!(peer_addr = %peer_addr, "Connection accepted");
                            stream
                        });
                        Some((next, (listener, shutdown)))
                    }
                }
            },
        )
    }
}

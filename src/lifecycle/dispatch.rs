//! HTTP/2 dispatch loop.
//!
//! Accepts connections from the listener stream and serves each one on its
//! own task. Every task spawned here, connections and the per-request
//! streams hyper spawns for them, is scoped to the loop future: dropping the
//! loop cancels them all. Aborting the dispatch task therefore abandons
//! outstanding requests instead of letting them finish unobserved.

use std::future::Future;
use std::io;

use futures_util::{Stream, StreamExt};
use hyper::rt::Executor;
use hyper::server::conn::http2;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tonic::service::Routes;
use tower::{Layer, ServiceExt};
use tower_http::trace::{GrpcMakeClassifier, Trace, TraceLayer};

use crate::lifecycle::shutdown;

/// Registered routes behind the request tracing layer.
pub(crate) type GrpcService = Trace<Routes, GrpcMakeClassifier>;

pub(crate) fn grpc_service(routes: Routes) -> GrpcService {
    TraceLayer::new_for_grpc().layer(routes)
}

/// Spawns hyper's tasks so that they end once the owning loop is dropped.
#[derive(Debug)]
struct ScopedExecutor {
    /// Closed when the loop's sender goes away.
    abandoned: broadcast::Receiver<()>,
}

impl Clone for ScopedExecutor {
    fn clone(&self) -> Self {
        Self {
            abandoned: self.abandoned.resubscribe(),
        }
    }
}

impl<F> Executor<F> for ScopedExecutor
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    fn execute(&self, fut: F) {
        let abandoned = shutdown::wait_for(self.abandoned.resubscribe());
        tokio::spawn(async move {
            tokio::select! {
                _ = fut => {}
                _ = abandoned => {}
            }
        });
    }
}

/// Serve `incoming` until it ends or `drain` resolves, then wait for open
/// connections to finish their in-flight requests.
///
/// Accept errors are logged and skipped.
pub(crate) async fn serve<I, D>(incoming: I, service: GrpcService, drain: D)
where
    I: Stream<Item = io::Result<TcpStream>>,
    D: Future<Output = ()>,
{
    let (abandon, abandoned) = broadcast::channel::<()>(1);
    let executor = ScopedExecutor { abandoned };
    let builder = http2::Builder::new(executor.clone());
    let graceful = GracefulShutdown::new();

    tokio::pin!(incoming);
    tokio::pin!(drain);

    loop {
        let stream = tokio::select! {
            biased;
            _ = &mut drain => break,
            next = incoming.next() => match next {
                Some(Ok(stream)) => stream,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "Failed to accept connection");
                    continue;
                }
                None => break,
            },
        };

        let service = TowerToHyperService::new(
            service
                .clone()
                .map_request(|req: hyper::Request<hyper::body::Incoming>| req.map(tonic::body::boxed)),
        );
        let connection = graceful.watch(builder.serve_connection(TokioIo::new(stream), service));
        executor.execute(async move {
            if let Err(err) = connection.await {
                tracing::debug!(error = %err, "Connection closed with an error");
            }
        });
    }

    tracing::debug!("No longer accepting, draining open connections");
    graceful.shutdown().await;
    drop(abandon);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_incoming_ends_loop() {
        let service = grpc_service(tonic::service::RoutesBuilder::default().routes());
        tokio::time::timeout(
            Duration::from_secs(1),
            serve(futures_util::stream::empty(), service, std::future::pending()),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_dropping_owner_cancels_spawned_work() {
        let (abandon, abandoned) = broadcast::channel::<()>(1);
        let executor = ScopedExecutor { abandoned };
        let finished = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&finished);
        executor.clone().execute(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            flag.store(true, Ordering::SeqCst);
        });

        drop(abandon);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}

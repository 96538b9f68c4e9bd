//! Server lifecycle manager.
//!
//! Owns the listener and the gRPC dispatch task and sequences start and
//! stop:
//!
//! ```text
//! Created ──start──▶ Starting ──bound──▶ Running ──stop──▶ Stopping ──drained──▶ Stopped
//!                        │                  │
//!                        └──bind error──▶ Failed ◀──loop exited──┘
//! ```
//!
//! Transitions only move forward; a stopped or failed manager cannot be
//! restarted.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use futures_util::Stream;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::{JoinError, JoinHandle};
use tonic::body::BoxBody;
use tonic::codegen::http::{Request, Response};
use tonic::codegen::Service;
use tonic::server::NamedService;
use tonic::service::RoutesBuilder;

use crate::lifecycle::dispatch::{self, GrpcService};
use crate::lifecycle::event::{EventSink, LifecycleEvent};
use crate::lifecycle::shutdown::{self, Shutdown};
use crate::net::{EndpointAddress, Listener, ListenerError};

/// Position of a manager in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl LifecycleState {
    /// `Stopped` and `Failed` are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Stopped | LifecycleState::Failed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Created => "created",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Errors returned by [`LifecycleManager`].
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The listener could not be bound. Never retried.
    #[error(transparent)]
    Bind(#[from] ListenerError),

    /// The operation is not allowed in the current state.
    #[error("cannot {operation} a server that is {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    /// A handler was registered after start.
    #[error("handlers must be registered before start (server is {0})")]
    RegistrationClosed(LifecycleState),

    #[error("failed to build reflection service: {0}")]
    Reflection(#[from] tonic_reflection::server::Error),

    /// The dispatch loop died while running.
    #[error("dispatch loop failed: {0}")]
    DispatchFatal(String),

    /// Draining took longer than the stop deadline; outstanding requests
    /// were abandoned.
    #[error("drain did not finish within {0:?}, in-flight requests were abandoned")]
    DrainTimeout(Duration),
}

/// Handlers and descriptor sets collected before start.
#[derive(Default)]
struct Registry {
    routes: RoutesBuilder,
    descriptor_sets: Vec<&'static [u8]>,
}

/// The running server. Exclusively owned by the manager.
struct ServerHandle {
    shutdown: Shutdown,
    /// Owns every connection; aborting it abandons in-flight requests.
    task: JoinHandle<()>,
}

/// Starts, supervises and gracefully stops one gRPC server.
pub struct LifecycleManager {
    name: String,
    sink: Arc<dyn EventSink>,
    /// `None` once start has begun; registration is closed from then on.
    registry: Mutex<Option<Registry>>,
    state: Arc<watch::Sender<LifecycleState>>,
    /// Held for the whole of `start` and `stop`, which serializes them.
    server: AsyncMutex<Option<ServerHandle>>,
    local_addr: OnceLock<SocketAddr>,
    /// Why the dispatch loop died, if it did.
    failure: Arc<OnceLock<String>>,
}

impl LifecycleManager {
    /// Create a manager for the component `name`, reporting to `sink`.
    pub fn new(name: impl Into<String>, sink: Arc<dyn EventSink>) -> Self {
        let (state, _) = watch::channel(LifecycleState::Created);
        Self {
            name: name.into(),
            sink,
            registry: Mutex::new(Some(Registry::default())),
            state: Arc::new(state),
            server: AsyncMutex::new(None),
            local_addr: OnceLock::new(),
            failure: Arc::new(OnceLock::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Why a running server moved to `Failed`.
    pub fn failure(&self) -> Option<LifecycleError> {
        self.failure
            .get()
            .map(|error| LifecycleError::DispatchFatal(error.clone()))
    }

    /// Attach a gRPC service to the server.
    ///
    /// Must be called before [`start`](Self::start). Later calls fail with
    /// [`LifecycleError::RegistrationClosed`].
    pub fn register_handler<S>(&self, service: S) -> Result<(), LifecycleError>
    where
        S: Service<Request<BoxBody>, Response = Response<BoxBody>, Error = Infallible>
            + NamedService
            + Clone
            + Send
            + 'static,
        S::Future: Send + 'static,
    {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(registry) = registry.as_mut() else {
            return Err(LifecycleError::RegistrationClosed(self.state()));
        };

        registry.routes.add_service(service);
        tracing::debug!(component = %self.name, service = S::NAME, "Handler registered");
        Ok(())
    }

    /// Serve `encoded_set` (a serialized `FileDescriptorSet`) through the
    /// gRPC reflection service. Same ordering rule as handlers.
    pub fn enable_reflection(&self, encoded_set: &'static [u8]) -> Result<(), LifecycleError> {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(registry) = registry.as_mut() else {
            return Err(LifecycleError::RegistrationClosed(self.state()));
        };

        registry.descriptor_sets.push(encoded_set);
        Ok(())
    }

    /// Bind `endpoint` and spawn the dispatch loop.
    ///
    /// Returns once the listener is bound, with the resolved local address.
    /// On failure the manager moves to `Failed` and cannot be started again.
    pub async fn start(&self, endpoint: &EndpointAddress) -> Result<SocketAddr, LifecycleError> {
        let mut server = self.server.lock().await;
        let registry = self.begin_start()?;

        let started_at = Instant::now();
        self.emit(LifecycleEvent::StartingHook {
            component: self.name.clone(),
        });

        let prepared = async {
            let service = build_service(registry)?;
            let listener = Listener::bind(endpoint).await?;
            Ok::<_, LifecycleError>((service, listener))
        };
        let (service, listener) = match prepared.await {
            Ok(prepared) => prepared,
            Err(err) => {
                self.state.send_replace(LifecycleState::Failed);
                let error = err.to_string();
                self.emit(LifecycleEvent::StartFailed {
                    component: self.name.clone(),
                    error: error.clone(),
                });
                self.emit(LifecycleEvent::RollingBack {
                    component: self.name.clone(),
                    error,
                });
                return Err(err);
            }
        };

        let address = listener.local_addr();
        let shutdown = Shutdown::new();
        let incoming = listener.into_incoming(shutdown.subscribe());
        *server = Some(self.launch(service, incoming, shutdown, address, started_at));
        Ok(address)
    }

    /// Stop accepting connections and drain in-flight requests.
    ///
    /// Blocks until the dispatch loop has exited. With a `deadline`, a drain
    /// that runs longer is abandoned: the loop is aborted, which cancels
    /// requests still in flight and closes their connections, and
    /// [`LifecycleError::DrainTimeout`] is returned
    /// after the manager has reached `Stopped`.
    ///
    /// Calling `stop` on a stopped or failed manager is a no-op.
    pub async fn stop(&self, deadline: Option<Duration>) -> Result<(), LifecycleError> {
        let mut server = self.server.lock().await;

        match self.state() {
            LifecycleState::Running => {}
            LifecycleState::Created => {
                self.registry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                self.state.send_replace(LifecycleState::Stopped);
                return Ok(());
            }
            LifecycleState::Stopped => return Ok(()),
            LifecycleState::Failed => {
                // The loop has already exited; only the handle is left.
                if let Some(handle) = server.take() {
                    let _ = handle.task.await;
                }
                return Ok(());
            }
            state @ (LifecycleState::Starting | LifecycleState::Stopping) => {
                return Err(LifecycleError::InvalidState {
                    operation: "stop",
                    state,
                });
            }
        }

        let Some(mut handle) = server.take() else {
            self.state.send_replace(LifecycleState::Stopped);
            return Ok(());
        };

        // The dispatch task may have failed between the check above and here.
        let stopping = self.state.send_if_modified(|state| {
            if *state == LifecycleState::Running {
                *state = LifecycleState::Stopping;
                true
            } else {
                false
            }
        });
        if !stopping {
            let _ = handle.task.await;
            return Ok(());
        }

        let stopping_at = Instant::now();
        self.emit(LifecycleEvent::StoppingHook {
            component: self.name.clone(),
        });

        handle.shutdown.trigger();

        let (error, result) = match deadline {
            Some(limit) => match tokio::time::timeout(limit, &mut handle.task).await {
                Ok(joined) => (drain_error(joined), Ok(())),
                Err(_) => {
                    handle.task.abort();
                    let _ = (&mut handle.task).await;
                    let err = LifecycleError::DrainTimeout(limit);
                    (Some(err.to_string()), Err(err))
                }
            },
            None => (drain_error((&mut handle.task).await), Ok(())),
        };

        if let Some(error) = &error {
            tracing::warn!(component = %self.name, error = %error, "Drain finished with an error");
        }

        self.state.send_replace(LifecycleState::Stopped);
        self.emit(LifecycleEvent::StoppedHook {
            component: self.name.clone(),
            runtime: stopping_at.elapsed(),
            error,
        });

        result
    }

    /// Wait until the manager reaches `Stopped` or `Failed`.
    pub async fn done(&self) -> LifecycleState {
        let mut rx = self.state.subscribe();
        let reached = rx.wait_for(|state| state.is_terminal()).await.map(|state| *state);
        reached.unwrap_or_else(|_| self.state())
    }

    /// Close registration and move `Created → Starting`.
    fn begin_start(&self) -> Result<Registry, LifecycleError> {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);

        let state = self.state();
        if state != LifecycleState::Created {
            return Err(LifecycleError::InvalidState {
                operation: "start",
                state,
            });
        }

        self.state.send_replace(LifecycleState::Starting);
        Ok(registry.take().unwrap_or_default())
    }

    /// Announce the server as running and spawn its supervised loop.
    fn launch<I>(
        &self,
        service: GrpcService,
        incoming: I,
        shutdown: Shutdown,
        address: SocketAddr,
        started_at: Instant,
    ) -> ServerHandle
    where
        I: Stream<Item = io::Result<TcpStream>> + Send + 'static,
    {
        let _ = self.local_addr.set(address);

        // Announced before the loop exists, so its failure always comes after.
        self.state.send_replace(LifecycleState::Running);
        self.emit(LifecycleEvent::StartedHook {
            component: self.name.clone(),
            address,
            runtime: started_at.elapsed(),
        });

        let dispatch = dispatch::serve(incoming, service, shutdown::wait_for(shutdown.subscribe()));
        let task = tokio::spawn(supervise(
            dispatch,
            Arc::clone(&self.state),
            Arc::clone(&self.sink),
            Arc::clone(&self.failure),
            self.name.clone(),
        ));

        ServerHandle { shutdown, task }
    }

    /// Start with a caller-supplied connection stream instead of a bound
    /// listener.
    #[cfg(test)]
    pub(crate) async fn start_with_incoming<I>(
        &self,
        incoming: I,
        address: SocketAddr,
    ) -> Result<(), LifecycleError>
    where
        I: Stream<Item = io::Result<TcpStream>> + Send + 'static,
    {
        let mut server = self.server.lock().await;
        let registry = self.begin_start()?;
        let started_at = Instant::now();
        self.emit(LifecycleEvent::StartingHook {
            component: self.name.clone(),
        });

        let service = build_service(registry)?;
        *server = Some(self.launch(service, incoming, Shutdown::new(), address, started_at));
        Ok(())
    }

    fn emit(&self, event: LifecycleEvent) {
        self.sink.log_event(&event);
    }
}

/// Turn the registry into the routed service, adding reflection if any
/// descriptor sets were registered.
fn build_service(registry: Registry) -> Result<GrpcService, LifecycleError> {
    let Registry {
        mut routes,
        descriptor_sets,
    } = registry;

    if !descriptor_sets.is_empty() {
        let mut reflection = tonic_reflection::server::Builder::configure();
        for set in descriptor_sets {
            reflection = reflection.register_encoded_file_descriptor_set(set);
        }
        routes.add_service(reflection.build_v1()?);
    }

    Ok(dispatch::grpc_service(routes.routes()))
}

/// Run the dispatch loop. A loop that ends while the manager is still
/// `Running` was not asked to stop, so the manager moves to `Failed`.
async fn supervise<F>(
    dispatch: F,
    state: Arc<watch::Sender<LifecycleState>>,
    sink: Arc<dyn EventSink>,
    failure: Arc<OnceLock<String>>,
    component: String,
) where
    F: Future<Output = ()>,
{
    dispatch.await;

    let error = "dispatch loop exited without a stop request".to_string();
    // The reason is recorded before waiters on `done` are woken.
    let escalated = state.send_if_modified(|state| {
        if *state != LifecycleState::Running {
            return false;
        }
        let _ = failure.set(error.clone());
        *state = LifecycleState::Failed;
        true
    });

    if escalated {
        tracing::error!(component = %component, error = %error, "Dispatch loop failed");
        sink.log_event(&LifecycleEvent::StartFailed { component, error });
    }
}

fn drain_error(joined: Result<(), JoinError>) -> Option<String> {
    joined
        .err()
        .map(|err| format!("dispatch task ended abnormally: {err}"))
}

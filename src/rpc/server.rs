//! The call-serving half of a node.
//!
//! # Responsibilities
//! - Bind the node's configured address (fatal on failure, no retry)
//! - Serve the `Greet` call until shutdown is requested
//! - Drain in-flight calls within a bounded grace period
//! - Publish lifecycle transitions on a watch channel
//!
//! # Design Decisions
//! - The listener socket is exclusively owned here
//! - Stop is requested via the shutdown signal, never called directly
//! - `Stopped` on the state channel is the deterministic fully-stopped
//!   signal the process blocks on before exiting

use std::net::SocketAddr;
use std::time::Duration;

use axum::{extract::State, routing::post, Json, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::schema::{ServerConfig, ShutdownConfig};
use crate::observability::metrics;
use crate::peers::{Node, NodeIndex};
use crate::rpc::{GreetRequest, GreetResponse};

/// Lifecycle of the call-serving loop. Mutated only by `GreetServer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Listening,
    Draining,
    Stopped,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Listening => "listening",
            LifecycleState::Draining => "draining",
            LifecycleState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// Error type for the serving loop.
#[derive(Debug)]
pub enum ServerError {
    /// The configured address could not be bound. Fatal for the process;
    /// ports are externally fixed, retrying cannot help.
    Bind(std::io::Error),
    /// The accept loop failed while serving.
    Serve(std::io::Error),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Bind(e) => write!(f, "failed to bind listener: {}", e),
            ServerError::Serve(e) => write!(f, "serving loop failed: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

/// State injected into the greet handler.
#[derive(Clone)]
struct GreetState {
    index: NodeIndex,
}

/// Serves the `Greet` call for one node.
pub struct GreetServer {
    node: Node,
    listener: TcpListener,
    state_tx: watch::Sender<LifecycleState>,
    state_rx: watch::Receiver<LifecycleState>,
    request_timeout: Duration,
    grace: Duration,
}

impl GreetServer {
    /// Bind the node's configured address.
    pub async fn bind(
        node: Node,
        server: &ServerConfig,
        shutdown: &ShutdownConfig,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(node.addr).await.map_err(ServerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ServerError::Bind)?;

        tracing::info!(
            node = %node.index,
            address = %local_addr,
            "Listener bound"
        );

        let (state_tx, state_rx) = watch::channel(LifecycleState::Starting);
        Ok(Self {
            node,
            listener,
            state_tx,
            state_rx,
            request_timeout: Duration::from_secs(server.request_timeout_secs),
            grace: Duration::from_secs(shutdown.grace_secs),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Watch handle over the lifecycle state.
    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state_rx.clone()
    }

    fn build_router(index: NodeIndex, request_timeout: Duration) -> Router {
        Router::new()
            .route("/greet", post(greet_handler))
            .with_state(GreetState { index })
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the call-accepting loop until the shutdown signal fires.
    ///
    /// On the first signal the state moves to `Draining`: no new
    /// connections are accepted and in-flight calls may finish within the
    /// grace period. `Stopped` is published in every exit path, grace
    /// expiry included.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) -> Result<(), ServerError> {
        let GreetServer {
            node,
            listener,
            state_tx,
            state_rx,
            request_timeout,
            grace,
        } = self;

        let app = Self::build_router(node.index, request_timeout);

        let _ = state_tx.send(LifecycleState::Listening);
        tracing::info!(node = %node.index, "Greet server listening");

        let drain_tx = state_tx.clone();
        let graceful = async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    // The signal is a level: a receiver obtained after the
                    // trigger still resolves immediately. A closed channel
                    // means the coordinator is gone; treat it as a stop
                    // request too.
                    while !*shutdown.borrow_and_update() {
                        if shutdown.changed().await.is_err() {
                            break;
                        }
                    }
                    tracing::info!("Shutdown requested, draining in-flight calls");
                    let _ = drain_tx.send(LifecycleState::Draining);
                })
                .await
        };

        // The graceful path drains unconditionally; the grace timer bounds
        // how long stragglers may hold the process open.
        let served = tokio::select! {
            result = graceful => result.map_err(ServerError::Serve),
            _ = grace_elapsed(state_rx, grace) => {
                tracing::warn!(
                    node = %node.index,
                    grace = ?grace,
                    "Grace period elapsed with calls still in flight, abandoning them"
                );
                Ok(())
            }
        };

        let _ = state_tx.send(LifecycleState::Stopped);
        tracing::info!(node = %node.index, "Greet server stopped");
        served
    }
}

/// Resolves once the grace period has passed, counted from the moment the
/// server enters `Draining`. Pends forever if draining never starts.
async fn grace_elapsed(mut state: watch::Receiver<LifecycleState>, grace: Duration) {
    while *state.borrow_and_update() != LifecycleState::Draining {
        if state.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
    tokio::time::sleep(grace).await;
}

/// Handler for the one remote operation, `Greet(caller) -> message`.
async fn greet_handler(
    State(state): State<GreetState>,
    Json(request): Json<GreetRequest>,
) -> Json<GreetResponse> {
    let caller = NodeIndex::new(request.caller);

    tracing::info!(
        node = %state.index,
        caller = %caller,
        "Received greeting"
    );
    metrics::record_greet_served(&caller);

    Json(GreetResponse {
        message: format!("Hello {} from {}", caller, state.index),
    })
}

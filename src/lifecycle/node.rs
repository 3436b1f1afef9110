//! Node process composition.
//!
//! # State Machine
//! ```text
//! Starting → Listening → Greeting → Running → Draining → Stopped
//!
//! Starting:  table built, listener bound (bind failure is fatal)
//! Listening: serve task running, readiness timer started
//! Greeting:  timer elapsed, fan-out dispatched
//! Running:   serving; greetings settle on their own
//! Draining:  shutdown observed, in-flight calls finishing
//! Stopped:   terminal, process exits
//! ```
//!
//! # Design Decisions
//! - Fail fast: any error before `Listening` aborts with no greetings sent
//! - Greeting dispatch does not gate `Running`; greeting is best-effort
//! - The server's `Stopped` watch value is what the process blocks on
//!   before exiting
//! - Shutdown does not cancel greeting units; each is bounded by its own
//!   deadline and the process waits for all of them to settle

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::config::MeshConfig;
use crate::greeter::PeerGreeter;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::observability::metrics;
use crate::peers::{NodeIndex, PeerTable, TableError};
use crate::rpc::{GreetServer, LifecycleState, ServerError};

/// Observable phase of the node process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Starting,
    Listening,
    Greeting,
    Running,
    Draining,
    Stopped,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeState::Starting => "starting",
            NodeState::Listening => "listening",
            NodeState::Greeting => "greeting",
            NodeState::Running => "running",
            NodeState::Draining => "draining",
            NodeState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// Fatal errors of the node process.
///
/// Everything here happens before or outside normal serving; per-peer
/// greeting failures never surface as a `NodeError`.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Composes the server, the greeter and the shutdown coordinator into one
/// node lifecycle.
pub struct NodeProcess {
    index: NodeIndex,
    config: MeshConfig,
    state_tx: watch::Sender<NodeState>,
    state_rx: watch::Receiver<NodeState>,
}

impl NodeProcess {
    pub fn new(index: usize, config: MeshConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(NodeState::Starting);
        Self {
            index: NodeIndex::new(index),
            config,
            state_tx,
            state_rx,
        }
    }

    /// Watch handle over the node state.
    pub fn state(&self) -> watch::Receiver<NodeState> {
        self.state_rx.clone()
    }

    /// Run the full lifecycle with OS signals driving shutdown.
    pub async fn run(self) -> Result<(), NodeError> {
        let shutdown = Shutdown::new();
        tokio::spawn(signals::listen(shutdown.clone()));
        self.run_with_shutdown(shutdown).await
    }

    /// Run the full lifecycle with an externally-owned shutdown
    /// coordinator, so several nodes can share one test process.
    pub async fn run_with_shutdown(self, shutdown: Shutdown) -> Result<(), NodeError> {
        let table = Arc::new(PeerTable::from_config(&self.config.peers)?);
        let node = table.get(self.index)?;
        tracing::info!(node = %node.index, address = %node.addr, "Node starting");

        // Bind before anything else; a bind failure must abort before any
        // peer greeting is attempted.
        let server = GreetServer::bind(node, &self.config.server, &self.config.shutdown).await?;
        let mut server_state = server.state();

        let mut serve_task = tokio::spawn(server.serve(shutdown.subscribe()));
        self.transition(NodeState::Listening);

        // Courtesy stagger while the rest of the mesh comes up; the
        // per-unit retries are what actually absorb a slow peer.
        tokio::time::sleep(Duration::from_millis(self.config.greeting.readiness_delay_ms)).await;

        self.transition(NodeState::Greeting);
        // A shutdown that landed during startup makes the fan-out pointless;
        // drain straight away instead of dialing peers.
        let greetings = if shutdown.is_triggered() {
            tracing::info!(node = %self.index, "Shutdown already requested, skipping greetings");
            None
        } else {
            let greeter =
                PeerGreeter::new(self.index, Arc::clone(&table), self.config.greeting.clone());
            Some(greeter.greet_all())
        };
        self.transition(NodeState::Running);

        // Block until shutdown is requested or the serve loop dies on its
        // own; either way the loop has to wind down before we exit.
        let served = tokio::select! {
            joined = &mut serve_task => {
                self.transition(NodeState::Draining);
                flatten_join(joined)
            }
            _ = shutdown.wait() => {
                self.transition(NodeState::Draining);
                flatten_join((&mut serve_task).await)
            }
        };

        // The server publishes Stopped when the drain finishes or its
        // grace period elapses; that is the deterministic exit signal.
        while *server_state.borrow_and_update() != LifecycleState::Stopped {
            if server_state.changed().await.is_err() {
                break;
            }
        }

        // Greeting units still inside their retry deadline are not
        // cancelled by shutdown; wait them out so dropping the runtime
        // cannot kill them mid-call.
        if let Some(greetings) = greetings {
            if !greetings.is_empty() {
                tracing::info!(
                    node = %self.index,
                    units = greetings.len(),
                    "Waiting for outstanding greeting units"
                );
            }
            greetings.settled().await;
        }

        self.transition(NodeState::Stopped);
        tracing::info!(node = %self.index, "Node exited");

        served?;
        Ok(())
    }

    fn transition(&self, next: NodeState) {
        let _ = self.state_tx.send(next);
        metrics::record_node_state(next);
        tracing::info!(node = %self.index, state = %next, "Node state changed");
    }
}

fn flatten_join(
    joined: Result<Result<(), ServerError>, tokio::task::JoinError>,
) -> Result<(), ServerError> {
    match joined {
        Ok(served) => served,
        Err(e) => Err(ServerError::Serve(std::io::Error::other(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_state_display() {
        assert_eq!(NodeState::Starting.to_string(), "starting");
        assert_eq!(NodeState::Running.to_string(), "running");
        assert_eq!(NodeState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn initial_state_is_starting() {
        let process = NodeProcess::new(0, MeshConfig::default());
        assert_eq!(*process.state().borrow(), NodeState::Starting);
    }
}

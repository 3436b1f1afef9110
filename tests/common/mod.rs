//! Shared helpers for mesh integration tests.

use std::time::Duration;

use tokio::sync::watch;

use greeter_mesh::config::MeshConfig;
use greeter_mesh::lifecycle::node::NodeState;
use greeter_mesh::peers::{NodeIndex, PeerTable};
use greeter_mesh::rpc::{GreetServer, LifecycleState};
use greeter_mesh::Shutdown;

/// Config for an in-process mesh on the given loopback ports, with tight
/// timings so tests settle quickly.
#[allow(dead_code)]
pub fn mesh_config(ports: &[u16]) -> MeshConfig {
    let mut config = MeshConfig::default();
    config.peers.ports = ports.to_vec();
    config.greeting.readiness_delay_ms = 50;
    config.greeting.call_timeout_ms = 500;
    config.greeting.max_attempts = 3;
    config.greeting.base_delay_ms = 50;
    config.greeting.max_delay_ms = 200;
    config.greeting.overall_deadline_ms = 3_000;
    config.shutdown.grace_secs = 2;
    config
}

/// Bind and spawn a bare greet server for one table entry, wired to the
/// given shutdown coordinator.
#[allow(dead_code)]
pub async fn spawn_peer_server(
    config: &MeshConfig,
    index: usize,
    shutdown: &Shutdown,
) -> watch::Receiver<LifecycleState> {
    let table = PeerTable::from_config(&config.peers).unwrap();
    let node = table.get(NodeIndex::new(index)).unwrap();
    let server = GreetServer::bind(node, &config.server, &config.shutdown)
        .await
        .unwrap();
    let state = server.state();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.serve(rx).await;
    });
    state
}

/// Wait until the node reports `target`, failing the test on timeout.
#[allow(dead_code)]
pub async fn wait_for_state(
    mut state: watch::Receiver<NodeState>,
    target: NodeState,
    timeout: Duration,
) {
    let reached = tokio::time::timeout(timeout, async {
        while *state.borrow_and_update() != target {
            if state.changed().await.is_err() {
                break;
            }
        }
    })
    .await;
    assert!(reached.is_ok(), "timed out waiting for node state {target}");
    assert_eq!(*state.borrow(), target);
}

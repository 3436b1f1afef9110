//! Integration tests for the node lifecycle and the greeting fan-out.

use std::sync::Arc;
use std::time::Duration;

use greeter_mesh::greeter::PeerGreeter;
use greeter_mesh::lifecycle::node::{NodeError, NodeState};
use greeter_mesh::peers::{NodeIndex, PeerTable};
use greeter_mesh::rpc::ServerError;
use greeter_mesh::{NodeProcess, Shutdown};

mod common;

#[tokio::test]
async fn greets_every_peer_exactly_once() {
    let config = common::mesh_config(&[29101, 29102, 29103]);
    let shutdown = Shutdown::new();

    common::spawn_peer_server(&config, 1, &shutdown).await;
    common::spawn_peer_server(&config, 2, &shutdown).await;

    let table = Arc::new(PeerTable::from_config(&config.peers).unwrap());
    let greeter = PeerGreeter::new(NodeIndex::new(0), table, config.greeting.clone());

    let mut outcomes = greeter.greet_all().settled().await;
    outcomes.sort_by_key(|o| o.peer);

    assert_eq!(outcomes.len(), 2, "one unit per peer index != own");
    assert_eq!(outcomes[0].peer, NodeIndex::new(1));
    assert_eq!(outcomes[1].peer, NodeIndex::new(2));
    for outcome in outcomes {
        let message = outcome.result.expect("greeting should succeed");
        assert!(message.contains("node-0"), "message names the caller: {message}");
        assert!(
            message.contains(&outcome.peer.to_string()),
            "message names the responder: {message}"
        );
    }

    shutdown.trigger();
}

#[tokio::test]
async fn slow_peer_is_greeted_after_retries() {
    let mut config = common::mesh_config(&[29151, 29152]);
    config.greeting.max_attempts = 10;
    let shutdown = Shutdown::new();

    // The peer comes up only after the first attempts have failed.
    let late_config = config.clone();
    let late_shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        common::spawn_peer_server(&late_config, 1, &late_shutdown).await;
    });

    let table = Arc::new(PeerTable::from_config(&config.peers).unwrap());
    let greeter = PeerGreeter::new(NodeIndex::new(0), table, config.greeting.clone());

    let outcomes = greeter.greet_all().settled().await;
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].result.is_ok(), "late peer should still be greeted");
    assert!(
        outcomes[0].attempts >= 2,
        "expected retries before success, got {}",
        outcomes[0].attempts
    );

    shutdown.trigger();
}

#[tokio::test]
async fn one_dead_peer_does_not_block_the_others() {
    let mut config = common::mesh_config(&[29301, 29302, 29303]);
    // keep the dead-peer unit short so the test settles quickly
    config.greeting.max_attempts = 2;
    config.greeting.overall_deadline_ms = 1_000;
    let shutdown = Shutdown::new();

    // Only peer 1 is alive; peer 2 is never started.
    common::spawn_peer_server(&config, 1, &shutdown).await;

    let table = Arc::new(PeerTable::from_config(&config.peers).unwrap());
    let greeter = PeerGreeter::new(NodeIndex::new(0), table, config.greeting.clone());

    let mut outcomes = greeter.greet_all().settled().await;
    outcomes.sort_by_key(|o| o.peer);

    assert_eq!(outcomes.len(), 2, "the dead peer is still attempted");
    assert!(outcomes[0].result.is_ok(), "live peer greeted");
    assert!(outcomes[1].result.is_err(), "dead peer reported, not fatal");

    shutdown.trigger();
}

#[tokio::test]
async fn node_stays_running_despite_failed_greetings() {
    let mut config = common::mesh_config(&[29201, 29202, 29203]);
    config.greeting.max_attempts = 2;
    config.greeting.overall_deadline_ms = 500;
    let shutdown = Shutdown::new();

    // Peer 1 is alive, peer 2 stays down for the whole test.
    common::spawn_peer_server(&config, 1, &shutdown).await;

    let node0 = NodeProcess::new(0, config.clone());
    let state = node0.state();
    let handle = tokio::spawn(node0.run_with_shutdown(shutdown.clone()));

    common::wait_for_state(state.clone(), NodeState::Running, Duration::from_secs(5)).await;

    // Let every greeting unit exhaust its budget against the dead peer.
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(*state.borrow(), NodeState::Running);

    // The serving loop is unaffected: node 0 still answers.
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let response = client
        .post("http://127.0.0.1:29201/greet")
        .json(&serde_json::json!({ "caller": 2 }))
        .send()
        .await
        .expect("node 0 should still serve");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("node-0"));

    shutdown.trigger();
    let result = handle.await.unwrap();
    assert!(result.is_ok(), "greeting failures never fail the node: {result:?}");
}

#[tokio::test]
async fn stop_is_idempotent_and_refuses_new_calls() {
    let mut config = common::mesh_config(&[29401, 29402]);
    config.greeting.max_attempts = 1;
    config.greeting.overall_deadline_ms = 600;
    let shutdown = Shutdown::new();

    let node0 = NodeProcess::new(0, config.clone());
    let state = node0.state();
    let handle = tokio::spawn(node0.run_with_shutdown(shutdown.clone()));

    common::wait_for_state(state.clone(), NodeState::Running, Duration::from_secs(5)).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let response = client
        .post("http://127.0.0.1:29401/greet")
        .json(&serde_json::json!({ "caller": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Triggering twice must behave exactly like triggering once.
    shutdown.trigger();
    shutdown.trigger();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("node should stop within the grace period")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(*state.borrow(), NodeState::Stopped);

    // The listener is gone; new calls are rejected.
    let refused = client
        .post("http://127.0.0.1:29401/greet")
        .json(&serde_json::json!({ "caller": 1 }))
        .send()
        .await;
    assert!(refused.is_err(), "no new call is accepted after stop");
}

#[tokio::test]
async fn bind_conflict_is_fatal_before_any_greeting() {
    let config = common::mesh_config(&[29501, 29502]);

    // Occupy node 0's port and watch peer 1's port for greeting attempts.
    let _squatter = tokio::net::TcpListener::bind("127.0.0.1:29501")
        .await
        .unwrap();
    let peer_port = tokio::net::TcpListener::bind("127.0.0.1:29502")
        .await
        .unwrap();

    let node0 = NodeProcess::new(0, config);
    let state = node0.state();
    let err = node0
        .run_with_shutdown(Shutdown::new())
        .await
        .expect_err("bind conflict must be fatal");
    assert!(matches!(err, NodeError::Server(ServerError::Bind(_))));
    assert_eq!(
        *state.borrow(),
        NodeState::Starting,
        "listening is never reached on a bind failure"
    );

    // No greeting may have been dispatched before the failure.
    let attempted = tokio::time::timeout(Duration::from_millis(500), peer_port.accept()).await;
    assert!(attempted.is_err(), "no connection to a peer after bind failure");
}

#[tokio::test]
async fn shutdown_waits_for_outstanding_greeting_units() {
    let mut config = common::mesh_config(&[29701, 29702]);
    // Peer 1 stays down; with plenty of attempts the unit keeps retrying
    // until its overall deadline, well past the shutdown trigger.
    config.greeting.max_attempts = 50;
    config.greeting.overall_deadline_ms = 1_500;
    let shutdown = Shutdown::new();

    let node0 = NodeProcess::new(0, config);
    let state = node0.state();
    let handle = tokio::spawn(node0.run_with_shutdown(shutdown.clone()));

    common::wait_for_state(state.clone(), NodeState::Running, Duration::from_secs(5)).await;

    // Shutdown lands while the unit is still retrying the dead peer.
    let triggered_at = std::time::Instant::now();
    shutdown.trigger();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("node should stop once the unit's deadline elapses")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(*state.borrow(), NodeState::Stopped);

    // The unit was waited out, not cancelled mid-retry: the node can only
    // have exited after the unit ran up against its deadline.
    let waited = triggered_at.elapsed();
    assert!(
        waited >= Duration::from_millis(800),
        "node exited after {waited:?}, before the in-flight unit settled"
    );
}

#[tokio::test]
async fn trigger_before_startup_still_stops_the_node() {
    let config = common::mesh_config(&[29751, 29752]);
    let peer_port = tokio::net::TcpListener::bind("127.0.0.1:29752")
        .await
        .unwrap();

    // The signal arrives before the node even starts running.
    let shutdown = Shutdown::new();
    shutdown.trigger();

    let node0 = NodeProcess::new(0, config);
    let state = node0.state();
    let result = tokio::time::timeout(Duration::from_secs(5), node0.run_with_shutdown(shutdown))
        .await
        .expect("an early trigger must not leave the node unstoppable");
    assert!(result.is_ok());
    assert_eq!(*state.borrow(), NodeState::Stopped);

    // With shutdown already requested there is no point dialing peers.
    let attempted = tokio::time::timeout(Duration::from_millis(500), peer_port.accept()).await;
    assert!(attempted.is_err(), "no greeting is dispatched after an early trigger");
}

#[tokio::test]
async fn termination_signal_stops_the_mesh_cleanly() {
    let config = common::mesh_config(&[29601, 29602]);
    let shutdown = Shutdown::new();

    let node0 = NodeProcess::new(0, config.clone());
    let node1 = NodeProcess::new(1, config.clone());
    let state0 = node0.state();
    let state1 = node1.state();
    let handle0 = tokio::spawn(node0.run_with_shutdown(shutdown.clone()));
    let handle1 = tokio::spawn(node1.run_with_shutdown(shutdown.clone()));

    common::wait_for_state(state0.clone(), NodeState::Running, Duration::from_secs(5)).await;
    common::wait_for_state(state1.clone(), NodeState::Running, Duration::from_secs(5)).await;

    // One trigger stands in for SIGTERM and stops every node sharing the
    // coordinator.
    shutdown.trigger();

    let result0 = tokio::time::timeout(Duration::from_secs(5), handle0)
        .await
        .expect("node 0 should stop within the grace period")
        .unwrap();
    let result1 = tokio::time::timeout(Duration::from_secs(5), handle1)
        .await
        .expect("node 1 should stop within the grace period")
        .unwrap();

    assert!(result0.is_ok());
    assert!(result1.is_ok());
    assert_eq!(*state0.borrow(), NodeState::Stopped);
    assert_eq!(*state1.borrow(), NodeState::Stopped);
}

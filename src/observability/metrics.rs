//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mesh_greetings_total` (counter): outbound greetings by peer, outcome
//! - `mesh_greet_requests_total` (counter): inbound greet calls served
//! - `mesh_node_state` (gauge): current node phase as an ordinal

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::lifecycle::node::NodeState;
use crate::peers::NodeIndex;

/// Install the Prometheus exporter.
///
/// Failure is logged, not fatal; the mesh works without an exporter.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the settled outcome of one outbound greeting unit.
pub fn record_greeting(peer: &NodeIndex, success: bool) {
    let outcome = if success { "ok" } else { "failed" };
    counter!(
        "mesh_greetings_total",
        "peer" => peer.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record one inbound greet call.
pub fn record_greet_served(caller: &NodeIndex) {
    counter!(
        "mesh_greet_requests_total",
        "caller" => caller.to_string()
    )
    .increment(1);
}

/// Publish the node phase as a gauge ordinal.
pub fn record_node_state(state: NodeState) {
    gauge!("mesh_node_state").set(state as u8 as f64);
}

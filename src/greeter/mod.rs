//! Peer greeting fan-out.
//!
//! # Data Flow
//! ```text
//! greet_all(own index)
//!     → one tokio task per peer index ≠ own
//!     → each task: connect → Greet(own) → log outcome
//!     → attempts retried with backoff under an overall deadline
//! ```
//!
//! # Design Decisions
//! - Units are independent: no ordering between them, and a failure in one
//!   never aborts another or the serving loop
//! - Dispatch is non-blocking; the node keeps the `GreetAllHandle` and
//!   awaits `settled` before it considers itself fully stopped, so a
//!   shutdown never cancels a unit that is still inside its deadline
//! - Readiness is handled by per-unit retries, not by a fixed delay

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;

use crate::config::schema::GreetingConfig;
use crate::observability::metrics;
use crate::peers::{Node, NodeIndex, PeerTable};
use crate::resilience::retries::RetryPolicy;
use crate::rpc::{GreetClient, GreetError};

/// The settled result of one greeting unit.
#[derive(Debug)]
pub struct GreetOutcome {
    pub peer: NodeIndex,
    pub attempts: u32,
    pub result: Result<String, GreetError>,
}

/// Handle over the dispatched greeting units.
pub struct GreetAllHandle {
    units: JoinSet<GreetOutcome>,
}

impl GreetAllHandle {
    /// Number of units not yet joined.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Wait for every unit to settle. Outcome order is not meaningful.
    pub async fn settled(mut self) -> Vec<GreetOutcome> {
        let mut outcomes = Vec::with_capacity(self.units.len());
        while let Some(joined) = self.units.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!(error = %e, "Greeting unit panicked"),
            }
        }
        outcomes
    }
}

/// Dials every other node in the table and greets it.
pub struct PeerGreeter {
    own: NodeIndex,
    table: Arc<PeerTable>,
    config: GreetingConfig,
}

impl PeerGreeter {
    pub fn new(own: NodeIndex, table: Arc<PeerTable>, config: GreetingConfig) -> Self {
        Self { own, table, config }
    }

    /// Dispatch one unit per peer. Returns once all units are spawned;
    /// they settle independently and in no particular order.
    pub fn greet_all(&self) -> GreetAllHandle {
        let policy = RetryPolicy::from_config(&self.config);
        let call_timeout = Duration::from_millis(self.config.call_timeout_ms);

        let mut units = JoinSet::new();
        for peer in self.table.peers_of(self.own) {
            let own = self.own;
            units.spawn(async move { greet_one(own, peer, policy, call_timeout).await });
        }

        tracing::debug!(
            node = %self.own,
            units = units.len(),
            "Greeting units dispatched"
        );

        GreetAllHandle { units }
    }
}

/// One unit of work: greet a single peer, retrying with backoff until the
/// policy is exhausted. Failure here is logged and contained.
async fn greet_one(
    own: NodeIndex,
    peer: Node,
    policy: RetryPolicy,
    call_timeout: Duration,
) -> GreetOutcome {
    let client = GreetClient::new(call_timeout);
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match client.greet(&peer, own).await {
            Ok(message) => {
                tracing::info!(
                    node = %own,
                    peer = %peer.index,
                    attempts = attempt,
                    message = %message,
                    "Greeting succeeded"
                );
                metrics::record_greeting(&peer.index, true);
                return GreetOutcome {
                    peer: peer.index,
                    attempts: attempt,
                    result: Ok(message),
                };
            }
            Err(e) => match policy.next_delay(attempt, started) {
                Some(delay) => {
                    tracing::debug!(
                        node = %own,
                        peer = %peer.index,
                        attempt,
                        error = %e,
                        delay = ?delay,
                        "Greeting attempt failed, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::warn!(
                        node = %own,
                        peer = %peer.index,
                        attempts = attempt,
                        error = %e,
                        "Greeting failed, giving up"
                    );
                    metrics::record_greeting(&peer.index, false);
                    return GreetOutcome {
                        peer: peer.index,
                        attempts: attempt,
                        result: Err(e),
                    };
                }
            },
        }
    }
}

//! Outbound half of the greeting call.
//!
//! # Responsibilities
//! - Establish a connection to a peer's address
//! - Invoke `Greet` with the caller's own index, bounded by a timeout
//! - Classify failures so the fan-out can decide whether to retry
//!
//! # Design Decisions
//! - Connections are owned by the call that created them and dropped when
//!   it resolves or times out; nothing is pooled across calls
//! - Every failure variant is recoverable at the fan-out level; none may
//!   reach the serving loop

use std::time::Duration;

use axum::body::Body;
use hyper::{header, Request, StatusCode};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use tokio::time;

use crate::peers::{Node, NodeIndex};
use crate::rpc::{GreetRequest, GreetResponse};

/// Error type for one greeting attempt.
#[derive(Debug, Error)]
pub enum GreetError {
    /// The peer could not be reached (refused, reset, transport failure).
    #[error("could not reach peer: {0}")]
    Connect(#[from] hyper_util::client::legacy::Error),

    /// The peer did not answer within the per-call timeout.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The peer's handler answered with a non-success status.
    #[error("peer answered with status {0}")]
    Status(StatusCode),

    /// The exchange completed but the payload could not be built or read.
    #[error("malformed greeting payload: {0}")]
    Body(String),
}

/// Client for the `Greet` call.
pub struct GreetClient {
    client: Client<HttpConnector, Body>,
    call_timeout: Duration,
}

impl GreetClient {
    pub fn new(call_timeout: Duration) -> Self {
        // pool_max_idle_per_host(0): the connection belongs to the call
        // that made it and is closed when the call completes
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());

        Self {
            client,
            call_timeout,
        }
    }

    /// Invoke `Greet` on `peer`, identifying as `caller`.
    ///
    /// One attempt, bounded by the per-call timeout. Retrying is the
    /// fan-out's decision, not the client's.
    pub async fn greet(&self, peer: &Node, caller: NodeIndex) -> Result<String, GreetError> {
        let payload = serde_json::to_string(&GreetRequest {
            caller: caller.as_usize(),
        })
        .map_err(|e| GreetError::Body(e.to_string()))?;

        let request = Request::post(format!("http://{}/greet", peer.addr))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload))
            .map_err(|e| GreetError::Body(e.to_string()))?;

        let response = match time::timeout(self.call_timeout, self.client.request(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(GreetError::Connect(e)),
            Err(_) => return Err(GreetError::Timeout(self.call_timeout)),
        };

        if !response.status().is_success() {
            return Err(GreetError::Status(response.status()));
        }

        let bytes = axum::body::to_bytes(Body::new(response.into_body()), 64 * 1024)
            .await
            .map_err(|e| GreetError::Body(e.to_string()))?;
        let parsed: GreetResponse =
            serde_json::from_slice(&bytes).map_err(|e| GreetError::Body(e.to_string()))?;

        Ok(parsed.message)
    }
}

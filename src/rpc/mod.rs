//! The remote greeting surface.
//!
//! # Data Flow
//! ```text
//! Inbound (server.rs):
//!     POST /greet {caller} → handler → {message} → caller
//!     Lifecycle: Starting → Listening → Draining → Stopped
//!
//! Outbound (client.rs):
//!     greet(peer, caller) → connect → one exchange → close
//!     Bounded by the per-call timeout; connection never pooled
//! ```
//!
//! # Design Decisions
//! - One operation only: `Greet(caller) -> message`
//! - The message text is informational, not contractual
//! - Remote errors surface as statuses and stay recoverable per call

pub mod client;
pub mod server;

use serde::{Deserialize, Serialize};

/// Request body for `POST /greet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetRequest {
    /// Index of the calling node.
    pub caller: usize,
}

/// Response body for `POST /greet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetResponse {
    /// Text acknowledging the caller and naming the responding node.
    pub message: String,
}

pub use client::{GreetClient, GreetError};
pub use server::{GreetServer, LifecycleState, ServerError};

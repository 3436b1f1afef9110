//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Greeting attempt fails:
//!     → retries.rs (attempts left? deadline left?)
//!     → backoff.rs (how long to wait before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Every outbound call has a per-attempt timeout and an overall deadline
//! - Jittered backoff keeps a mesh that starts in lockstep from retrying
//!   in lockstep
//! - Bind failures are never retried; the ports are externally fixed

pub mod backoff;
pub mod retries;

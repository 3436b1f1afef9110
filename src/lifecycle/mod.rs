//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (node.rs):
//!     Build table → Bind listener → Spawn serve → Dispatch greetings
//!
//! Shutdown (shutdown.rs):
//!     First trigger → level flips once → server drains → units settle → Stopped
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → trigger()
//! ```
//!
//! # Design Decisions
//! - Ordered startup: table first, then listener, greetings last
//! - Shutdown is a token passed into the serving loop, not a
//!   signal-handler side effect
//! - Duplicate triggers are coalesced, never queued

pub mod node;
pub mod shutdown;
pub mod signals;

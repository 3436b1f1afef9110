//! greeter-mesh: a fixed-membership node mesh.
//!
//! Every process in the mesh is a node with a static index. On startup a
//! node binds its listener, begins serving the `Greet` call, and then
//! contacts every other node in the table once. Shutdown is driven by OS
//! signals and drains in-flight calls before the process exits.
//!
//! # Architecture Overview
//!
//! ```text
//!                ┌───────────────────────────────────────────────┐
//!                │                  NODE PROCESS                  │
//!                │                                                │
//!   Greet call   │  ┌─────────┐        ┌──────────────────────┐  │
//!   ─────────────┼─▶│   rpc   │        │      lifecycle       │  │
//!                │  │ server  │◀───────│  node / shutdown /   │  │
//!                │  └─────────┘  stop  │       signals        │  │
//!                │                     └──────────┬───────────┘  │
//!                │                                │ dispatch     │
//!                │  ┌─────────┐        ┌──────────▼───────────┐  │
//!   Greet call   │  │   rpc   │        │       greeter        │  │
//!   ◀────────────┼──│ client  │◀───────│  one task per peer   │  │
//!                │  └─────────┘        └──────────────────────┘  │
//!                │                                                │
//!                │  ┌──────────────────────────────────────────┐ │
//!                │  │   config │ peers │ resilience │ observ.  │ │
//!                │  └──────────────────────────────────────────┘ │
//!                └───────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod greeter;
pub mod peers;
pub mod rpc;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::MeshConfig;
pub use lifecycle::node::NodeProcess;
pub use lifecycle::shutdown::Shutdown;
pub use peers::PeerTable;

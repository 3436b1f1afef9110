//! The static peer table.
//!
//! # Design Decisions
//! - The table is an explicit, immutable value passed into each component
//!   at construction; there is no process-global state, so several node
//!   instances can coexist in one test process
//! - Indices are dense (0..N-1) and addresses unique, by construction

pub mod table;

pub use table::Node;
pub use table::NodeIndex;
pub use table::PeerTable;
pub use table::TableError;

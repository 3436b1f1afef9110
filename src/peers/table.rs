//! Node identity and the index → address mapping.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::PeerTableConfig;

/// Position of a node in the peer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub fn new(value: usize) -> Self {
        Self(value)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl From<usize> for NodeIndex {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// One participant in the mesh: a fixed index and its listen address.
/// Immutable for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub index: NodeIndex,
    pub addr: SocketAddr,
}

/// Error type for peer table construction and lookup.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("peer table is empty")]
    Empty,

    #[error("duplicate address {0} in peer table")]
    DuplicateAddress(SocketAddr),

    #[error("node index {index} out of range for a table of {size} nodes")]
    IndexOutOfRange { index: usize, size: usize },
}

/// Ordered, immutable mapping from node index to network address.
///
/// Indices are dense (`0..N-1`) by construction: node `i` is the `i`-th
/// entry of the configured port list.
#[derive(Debug, Clone)]
pub struct PeerTable {
    nodes: Vec<Node>,
}

impl PeerTable {
    /// Build the table from configuration, enforcing its invariants.
    pub fn from_config(config: &PeerTableConfig) -> Result<Self, TableError> {
        if config.ports.is_empty() {
            return Err(TableError::Empty);
        }

        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(config.ports.len());
        for (i, port) in config.ports.iter().enumerate() {
            let addr = SocketAddr::new(config.host, *port);
            if !seen.insert(addr) {
                return Err(TableError::DuplicateAddress(addr));
            }
            nodes.push(Node {
                index: NodeIndex::new(i),
                addr,
            });
        }

        Ok(Self { nodes })
    }

    /// Look up a node by index.
    pub fn get(&self, index: NodeIndex) -> Result<Node, TableError> {
        self.nodes
            .get(index.as_usize())
            .copied()
            .ok_or(TableError::IndexOutOfRange {
                index: index.as_usize(),
                size: self.nodes.len(),
            })
    }

    /// All nodes other than `own`, in table order.
    pub fn peers_of(&self, own: NodeIndex) -> impl Iterator<Item = Node> + '_ {
        self.nodes.iter().copied().filter(move |n| n.index != own)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Defaults reproduce the compiled-in three-node table on loopback ports
//! 4001-4003, so a node can run with no config file at all.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

/// Root configuration for one mesh node.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MeshConfig {
    /// The static peer table shared by every node in the mesh.
    pub peers: PeerTableConfig,

    /// Inbound call-serving settings.
    pub server: ServerConfig,

    /// Outbound greeting settings.
    pub greeting: GreetingConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Static peer table configuration.
///
/// Node `i` listens on `ports[i]`; the table is dense by construction.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PeerTableConfig {
    /// Host shared by every node (the mesh runs on one machine).
    pub host: IpAddr,

    /// One listen port per node index.
    pub ports: Vec<u16>,
}

impl Default for PeerTableConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ports: vec![4001, 4002, 4003],
        }
    }
}

/// Inbound serving configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Per-request timeout applied by the middleware stack, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

/// Outbound greeting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GreetingConfig {
    /// Delay between the listener coming up and the first outbound
    /// greeting, in milliseconds. A stagger, not a correctness mechanism;
    /// readiness is handled by per-peer retries.
    pub readiness_delay_ms: u64,

    /// Timeout for a single `Greet` call attempt, in milliseconds.
    pub call_timeout_ms: u64,

    /// Maximum attempts per peer before giving up.
    pub max_attempts: u32,

    /// Base delay for exponential backoff between attempts, in milliseconds.
    pub base_delay_ms: u64,

    /// Cap on the backoff delay, in milliseconds.
    pub max_delay_ms: u64,

    /// Overall deadline for greeting one peer, retries included,
    /// in milliseconds.
    pub overall_deadline_ms: u64,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            readiness_delay_ms: 500,
            call_timeout_ms: 1_000,
            max_attempts: 5,
            base_delay_ms: 200,
            max_delay_ms: 2_000,
            overall_deadline_ms: 10_000,
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long draining may take before in-flight calls are abandoned,
    /// in seconds.
    pub grace_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_secs: 10 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

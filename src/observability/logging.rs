//! Structured logging initialization.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber. Call once, before any other
/// subsystem starts.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to
/// this crate and `tower_http` stays at warn.
pub fn init_logging(level: &str) {
    let fallback = format!("greeter_mesh={level},tower_http=warn");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

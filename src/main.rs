//! Mesh node binary.
//!
//! Runs one node of the fixed greeting mesh: parses the node index,
//! loads configuration, and drives the node lifecycle until a
//! termination signal arrives.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use greeter_mesh::config::loader::{self, ConfigError};
use greeter_mesh::config::MeshConfig;
use greeter_mesh::observability::{logging, metrics};
use greeter_mesh::NodeProcess;

#[derive(Parser)]
#[command(name = "greeter-mesh")]
#[command(about = "Runs one node of the fixed greeting mesh", long_about = None)]
struct Cli {
    /// Index of this node in the peer table (0-based).
    index: usize,

    /// Optional TOML config file; compiled-in defaults are used when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configuration errors are fatal and happen before any network action.
    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        index = cli.index,
        "greeter-mesh starting"
    );

    if cli.index >= config.peers.ports.len() {
        tracing::error!(
            index = cli.index,
            table_size = config.peers.ports.len(),
            "Node index out of range"
        );
        return ExitCode::FAILURE;
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    match NodeProcess::new(cli.index, config).run().await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Node failed");
            ExitCode::FAILURE
        }
    }
}

fn load(cli: &Cli) -> Result<MeshConfig, ConfigError> {
    match &cli.config {
        Some(path) => loader::load_config(path),
        None => loader::default_config(),
    }
}

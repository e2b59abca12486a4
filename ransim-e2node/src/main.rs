//! ransim - simulated O-RAN E2 nodes
//!
//! Loads the simulation model, starts one E2 agent per selected node and runs
//! until interrupted.
//!
//! # Usage
//!
//! ```bash
//! ransim -c config/model.yaml
//! ransim -c config/model.yaml --node node-1 --node node-2 -l debug
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use ransim_common::{init_logging, load_and_validate_model, LogLevel};
use ransim_e2ap::{TcpDialer, TransportConfig};
use ransim_e2node::E2Agents;

/// ransim - O-RAN E2 Node Simulator
#[derive(Parser, Debug)]
#[command(name = "ransim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the simulation model (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config_file: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    log_level: LogLevel,

    /// Node to simulate; repeat for several. Defaults to every node.
    #[arg(long = "node", value_name = "NAME")]
    nodes: Vec<String>,
}

async fn run(args: Args) -> Result<()> {
    info!("Loading model from: {}", args.config_file);
    let model = load_and_validate_model(&args.config_file)
        .with_context(|| format!("Failed to load model from {}", args.config_file))?;
    info!(
        "Model loaded: {} node(s), {} controller(s), {} service model(s)",
        model.nodes.len(),
        model.controllers.len(),
        model.service_models.len()
    );

    let dialer = Arc::new(TcpDialer::new(TransportConfig::default()));
    let agents = E2Agents::new(Arc::new(model), dialer);
    if let Err(e) = agents.start(&args.nodes).await {
        agents.stop_all().await;
        return Err(e).context("Failed to start E2 agents");
    }

    signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Received Ctrl+C, shutting down...");

    agents.stop_all().await;
    info!("All E2 agents stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

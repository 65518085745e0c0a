//! Load balancer simulator.
//!
//! Spins up simulated backend servers on demand and routes requests to them
//! through a pluggable selection algorithm, with periodic health checking.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                     SIMULATOR                        │
//!                     │                                                      │
//!   Admin API         │  ┌─────────┐    ┌────────────┐    ┌──────────────┐   │
//!   ──────────────────┼─▶│  admin  │───▶│ simulation │───▶│ load_balancer│   │
//!   /api/*            │  │ (axum)  │    │  context   │    │  dispatcher  │   │
//!                     │  └────┬────┘    └─────┬──────┘    └──────┬───────┘   │
//!   Log stream        │       │               │                  │ POST      │
//!   ◀─────────────────┼───────┘ events        │ start/stop       ▼ /process  │
//!   /api/logs (ws)    │                       │           ┌──────────────┐   │
//!                     │                       └──────────▶│   server     │   │
//!                     │  ┌──────────────┐   GET /health   │ S0 .. Sn-1   │   │
//!                     │  │    health    │────────────────▶│ (simulated)  │   │
//!                     │  │   monitor    │                 └──────────────┘   │
//!                     │  └──────────────┘                                    │
//!                     │                                                      │
//!                     │  config · observability · resilience · lifecycle     │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use lb_simulator::config::{load_config, SimulatorConfig};
use lb_simulator::lifecycle::signals;
use lb_simulator::observability::{logging, metrics};
use lb_simulator::simulation::{Simulation, SimulationError, StartParams};

#[derive(Parser)]
#[command(name = "lb-simulator")]
#[command(about = "Load balancer simulator with pluggable algorithms and health checking", long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start a simulation with the configured defaults right away.
    #[arg(long)]
    autostart: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimulatorConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!("lb-simulator v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        admin_address = %config.admin.bind_address,
        num_backends = config.simulation.num_backends,
        algorithm = %config.simulation.algorithm,
        base_port = config.simulation.base_port,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.admin.bind_address).await?;
    let sim = Arc::new(Simulation::new(config));

    if args.autostart {
        sim.start(StartParams::from_defaults(sim.config())).await?;
    }

    lb_simulator::admin::serve(listener, sim.clone(), signals::ctrl_c()).await?;

    match sim.stop().await {
        Ok(()) | Err(SimulationError::NotRunning) => {}
        Err(e) => tracing::error!(error = %e, "Failed to stop simulation"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

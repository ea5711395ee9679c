//! Arcade gateway.
//!
//! HTTP entry point for the gaming platform's REST backends. Each configured
//! route may declare a sliding-window rate limit; admitted requests are
//! forwarded to the route's upstream.
//!
//! ```text
//!  client ──▶ request id ──▶ route match ──▶ rate limit ──▶ forward ──▶ upstream
//!                               │ 404           │ 429           │ 502
//!                               ▼               ▼               ▼
//!                            client          client          client
//! ```
//!
//! The limiter keeps its state in this process only. Several gateway
//! instances do not share counters.

use std::path::PathBuf;

use arcade_gateway::config::{load_config, GatewayConfig};
use arcade_gateway::lifecycle::startup;
use arcade_gateway::observability::logging::init_logging;
use clap::Parser;

#[derive(Parser)]
#[command(name = "arcade-gateway")]
#[command(about = "Rate-limiting API gateway for the arcade platform", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!("arcade-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

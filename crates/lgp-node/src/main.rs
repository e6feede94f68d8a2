//! # LGP Node
//!
//! Runs the hybrid planner over a simulated episode.
//!
//! Usage: `lgp-node [config.json]`. Without a config file the built-in
//! scenario runs with default settings.

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;
mod runner;
mod scenario;

use config::NodeConfig;
use runner::Runner;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("LGP Node starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            info!("Loading config from {}", path.display());
            NodeConfig::load(&path)?
        }
        None => NodeConfig::default(),
    };

    let mut runner = Runner::from_config(&config)?;
    let summary = runner.run();
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

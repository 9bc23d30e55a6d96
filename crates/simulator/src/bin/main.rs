//! Sanders mutual-exclusion simulator CLI.
//!
//! Runs the protocol over a grid or ring and prints a report.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 5x5 grid, 1000 rounds
//! sanders-sim
//!
//! # 10x10 grid, 5000 rounds, per-round log
//! sanders-sim --grid 10 --rounds 5000 --csv rounds.csv
//!
//! # From a file, with overrides
//! sanders-sim --config sim.toml --seed 7
//!
//! # With debug logging
//! RUST_LOG=debug sanders-sim --ring 8 --rounds 50
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use sanders_simulator::{Simulator, SimulatorConfig, TopologyConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sanders-sim")]
#[command(about = "Neighborhood mutual-exclusion simulator")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use an NxN grid topology
    #[arg(long, conflicts_with = "ring")]
    grid: Option<u32>,

    /// Use a ring of N nodes
    #[arg(long)]
    ring: Option<u32>,

    /// Number of rounds to run
    #[arg(short, long)]
    rounds: Option<u64>,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Per-round probability that an idle node requests entry
    #[arg(long)]
    entry_threshold: Option<f64>,

    /// Write per-round statistics to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Apply command-line overrides on top of `config`.
    fn apply(&self, mut config: SimulatorConfig) -> SimulatorConfig {
        if let Some(size) = self.grid {
            config.topology = TopologyConfig::Grid { size };
        }
        if let Some(nodes) = self.ring {
            config.topology = TopologyConfig::Ring { nodes };
        }
        if let Some(rounds) = self.rounds {
            config.rounds = rounds;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(threshold) = self.entry_threshold {
            config.mutex.entry_threshold = threshold;
        }
        if let Some(path) = &self.csv {
            config.csv_path = Some(path.clone());
        }
        config
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SimulatorConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SimulatorConfig::default(),
    };
    let config = cli.apply(config);

    let simulator = Simulator::new(config).context("invalid simulation setup")?;
    let report = simulator.run().context("simulation failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }

    Ok(())
}

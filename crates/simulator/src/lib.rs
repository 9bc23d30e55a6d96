//! Sanders Simulator
//!
//! Runs the neighborhood mutual-exclusion protocol over a configured
//! topology and reports how it behaved.
//!
//! # Architecture
//!
//! The simulator builds on `sanders-simulation` to provide:
//!
//! - **Configuration**: TOML-loadable topology, round count, seed and protocol parameters
//! - **Metrics Collection**: waiting-time percentiles, entry and message totals
//! - **Round Log**: per-round population counts written as CSV
//!
//! # Example
//!
//! ```ignore
//! use sanders_simulator::{Simulator, SimulatorConfig, TopologyConfig};
//!
//! let config = SimulatorConfig::default()
//!     .with_topology(TopologyConfig::Grid { size: 10 })
//!     .with_rounds(5_000);
//!
//! let report = Simulator::new(config)?.run()?;
//! println!("P99 wait: {} rounds", report.wait_p99);
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod round_log;
pub mod runner;

pub use config::{ConfigError, SimulatorConfig, TopologyConfig};
pub use error::SimulatorError;
pub use metrics::{MetricsCollector, MetricsError, SimulationReport};
pub use round_log::{write_csv, write_csv_file};
pub use runner::Simulator;

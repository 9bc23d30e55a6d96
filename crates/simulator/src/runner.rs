//! The simulator: topology, runner and metrics wired together from a config.

use crate::config::SimulatorConfig;
use crate::metrics::{MetricsCollector, SimulationReport};
use crate::round_log::write_csv_file;
use crate::SimulatorError;
use sanders_simulation::SimulationRunner;
use tracing::info;

/// A configured simulation, ready to run.
pub struct Simulator {
    config: SimulatorConfig,
    runner: SimulationRunner,
    metrics: MetricsCollector,
}

impl Simulator {
    /// Validate `config` and build the topology and nodes.
    pub fn new(config: SimulatorConfig) -> Result<Self, SimulatorError> {
        config.validate()?;
        let topology = config
            .topology
            .build()
            .map_err(crate::ConfigError::from)?
            .into_arc();
        let runner = SimulationRunner::new(topology, &config.mutex, config.seed);

        Ok(Self {
            config,
            runner,
            metrics: MetricsCollector::new()?,
        })
    }

    /// The configuration this simulator was built from.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// The underlying runner.
    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }

    /// Run every configured round, write the round log, and report.
    pub fn run(mut self) -> Result<SimulationReport, SimulatorError> {
        info!(
            topology = ?self.config.topology,
            rounds = self.config.rounds,
            seed = self.config.seed,
            "Starting simulation"
        );

        for _ in 0..self.config.rounds {
            let snapshot = self.runner.step()?;
            self.metrics.record_round(&snapshot, self.runner.nodes());
        }

        if let Some(path) = &self.config.csv_path {
            write_csv_file(path, self.runner.snapshots()).map_err(|source| {
                SimulatorError::RoundLog {
                    path: path.clone(),
                    source,
                }
            })?;
            info!(path = %path.display(), "Wrote round log");
        }

        let report = self.metrics.finalize();
        info!(
            entries = report.cs_entries,
            messages = report.messages,
            relinquishes = report.relinquishes,
            "Simulation finished"
        );
        Ok(report)
    }
}

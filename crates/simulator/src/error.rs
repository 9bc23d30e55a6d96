//! Errors surfaced by [`crate::Simulator`].

use crate::{ConfigError, MetricsError};
use sanders_simulation::SimulationError;
use std::path::PathBuf;
use thiserror::Error;

/// Anything that stops a simulator run.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("simulation aborted: {0}")]
    Simulation(#[from] SimulationError),

    #[error("failed to write round log {}: {source}", path.display())]
    RoundLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

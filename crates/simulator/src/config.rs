//! Configuration types for the simulator.

use sanders_mutex::MutexConfig;
use sanders_types::{StaticTopology, TopologyError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading or validating a [`SimulatorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Neighbor graph to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopologyConfig {
    /// `size * size` nodes; neighbors share a row or a column.
    Grid { size: u32 },

    /// `nodes` nodes in a cycle.
    Ring { nodes: u32 },
}

impl TopologyConfig {
    /// Build the topology.
    pub fn build(&self) -> Result<StaticTopology, TopologyError> {
        match *self {
            TopologyConfig::Grid { size } => StaticTopology::grid(size),
            TopologyConfig::Ring { nodes } => StaticTopology::ring(nodes),
        }
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        TopologyConfig::Grid { size: 5 }
    }
}

/// Configuration for a simulation run.
///
/// Loaded from TOML; every field is optional:
///
/// ```toml
/// rounds = 2000
/// seed = 7
/// csv_path = "rounds.csv"
///
/// [topology]
/// kind = "grid"
/// size = 10
///
/// [mutex]
/// entry_threshold = 0.05
/// dwell_distribution = { kind = "exponential", mean = 4.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Neighbor graph.
    pub topology: TopologyConfig,

    /// Number of rounds to run.
    pub rounds: u64,

    /// Random seed for deterministic simulation.
    pub seed: u64,

    /// Protocol parameters, shared by every node.
    pub mutex: MutexConfig,

    /// Where to write the per-round CSV log, if anywhere.
    pub csv_path: Option<PathBuf>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            topology: TopologyConfig::default(),
            rounds: 1000,
            seed: 12345,
            mutex: MutexConfig::default(),
            csv_path: None,
        }
    }
}

impl SimulatorConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Set the topology.
    pub fn with_topology(mut self, topology: TopologyConfig) -> Self {
        self.topology = topology;
        self
    }

    /// Set the number of rounds.
    pub fn with_rounds(mut self, rounds: u64) -> Self {
        self.rounds = rounds;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the protocol parameters.
    pub fn with_mutex(mut self, mutex: MutexConfig) -> Self {
        self.mutex = mutex;
        self
    }

    /// Write the per-round log to `path`.
    pub fn with_csv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_path = Some(path.into());
        self
    }

    /// Reject values no run can use.
    ///
    /// Distribution parameters are not checked here; a bad distribution
    /// makes the affected nodes fall back at sampling time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rounds == 0 {
            return Err(ConfigError::Invalid("rounds must be positive".into()));
        }
        if !self.mutex.entry_threshold.is_finite() {
            return Err(ConfigError::Invalid(
                "mutex.entry_threshold must be finite".into(),
            ));
        }
        if self.mutex.fallback_dwell_rounds == 0 {
            return Err(ConfigError::Invalid(
                "mutex.fallback_dwell_rounds must be positive".into(),
            ));
        }
        match self.topology {
            TopologyConfig::Grid { size: 0 } | TopologyConfig::Ring { nodes: 0 } => {
                Err(ConfigError::Invalid("topology must have at least one node".into()))
            }
            _ => Ok(()),
        }
    }
}

//! Protocol configuration.

use serde::{Deserialize, Serialize};

/// A random distribution a sampler draws from.
///
/// Parameters are validated when sampling, not when parsing, so a bad
/// configuration degrades into the node's local fallback instead of
/// aborting the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionConfig {
    /// Always the same value.
    Constant { value: f64 },

    /// Uniform over `[min, max]`.
    Uniform { min: f64, max: f64 },

    /// Exponential with the given mean.
    Exponential { mean: f64 },
}

/// Configuration for the mutual-exclusion state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutexConfig {
    /// Distribution sampled once per round by an idle node.
    pub entry_distribution: DistributionConfig,

    /// An idle node requests entry when its sample is `<=` this threshold.
    ///
    /// With the default uniform(0, 1) entry distribution this is the per-round
    /// probability of requesting entry.
    pub entry_threshold: f64,

    /// Distribution of the time spent inside the critical section, in rounds.
    pub dwell_distribution: DistributionConfig,

    /// Dwell time used when the dwell sampler fails.
    pub fallback_dwell_rounds: u64,
}

impl Default for MutexConfig {
    fn default() -> Self {
        Self {
            entry_distribution: DistributionConfig::Uniform { min: 0.0, max: 1.0 },
            entry_threshold: 0.02,
            dwell_distribution: DistributionConfig::Uniform {
                min: 1.0,
                max: 10.0,
            },
            fallback_dwell_rounds: 5,
        }
    }
}

impl MutexConfig {
    /// Set the entry threshold.
    pub fn with_entry_threshold(mut self, threshold: f64) -> Self {
        self.entry_threshold = threshold;
        self
    }

    /// Set the entry distribution.
    pub fn with_entry_distribution(mut self, distribution: DistributionConfig) -> Self {
        self.entry_distribution = distribution;
        self
    }

    /// Set the dwell distribution.
    pub fn with_dwell_distribution(mut self, distribution: DistributionConfig) -> Self {
        self.dwell_distribution = distribution;
        self
    }

    /// Set the fallback dwell time.
    pub fn with_fallback_dwell_rounds(mut self, rounds: u64) -> Self {
        self.fallback_dwell_rounds = rounds;
        self
    }

    /// Fixed dwell time of `rounds`.
    pub fn with_constant_dwell(self, rounds: u64) -> Self {
        self.with_dwell_distribution(DistributionConfig::Constant {
            value: rounds as f64,
        })
    }
}

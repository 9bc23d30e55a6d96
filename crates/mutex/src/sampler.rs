//! Random sources for the entry decision and the dwell time.

use crate::DistributionConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// Failure to draw a sample.
///
/// Never fatal: the node falls back to "stay idle" or to the fixed dwell.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplingError {
    /// The configured distribution parameters are unusable.
    #[error("invalid {kind} distribution: {reason}")]
    InvalidParameters {
        kind: &'static str,
        reason: &'static str,
    },

    /// The source could not produce a value.
    #[error("sampling source unavailable: {0}")]
    Unavailable(String),
}

/// A source of floating-point samples.
pub trait Sampler: Send {
    /// Draw the next sample.
    fn sample(&mut self) -> Result<f64, SamplingError>;
}

impl<F> Sampler for F
where
    F: FnMut() -> Result<f64, SamplingError> + Send,
{
    fn sample(&mut self) -> Result<f64, SamplingError> {
        self()
    }
}

/// Seeded sampler over a configured distribution.
#[derive(Debug, Clone)]
pub struct DistributionSampler {
    distribution: DistributionConfig,
    rng: ChaCha8Rng,
}

impl DistributionSampler {
    /// Create a sampler with its own deterministic RNG stream.
    pub fn new(distribution: DistributionConfig, seed: u64) -> Self {
        Self {
            distribution,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The distribution this sampler draws from.
    pub fn distribution(&self) -> DistributionConfig {
        self.distribution
    }
}

impl Sampler for DistributionSampler {
    fn sample(&mut self) -> Result<f64, SamplingError> {
        match self.distribution {
            DistributionConfig::Constant { value } => {
                if !value.is_finite() {
                    return Err(SamplingError::InvalidParameters {
                        kind: "constant",
                        reason: "value must be finite",
                    });
                }
                Ok(value)
            }
            DistributionConfig::Uniform { min, max } => {
                if !(min.is_finite() && max.is_finite()) {
                    return Err(SamplingError::InvalidParameters {
                        kind: "uniform",
                        reason: "bounds must be finite",
                    });
                }
                if min > max {
                    return Err(SamplingError::InvalidParameters {
                        kind: "uniform",
                        reason: "min must not exceed max",
                    });
                }
                Ok(self.rng.gen_range(min..=max))
            }
            DistributionConfig::Exponential { mean } => {
                if !(mean.is_finite() && mean > 0.0) {
                    return Err(SamplingError::InvalidParameters {
                        kind: "exponential",
                        reason: "mean must be positive",
                    });
                }
                // Inverse transform; 1 - u is in (0, 1].
                let u: f64 = self.rng.gen();
                Ok(-mean * (1.0 - u).ln())
            }
        }
    }
}

//! Configuration management for QVL.

use crate::clock::ClockMode;
use crate::error::{QvlError, Result};
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for one QVL context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QvlConfig {
    pub reputation: ReputationConfig,
    pub betrayal: BetrayalConfig,
    pub proof: ProofConfig,
    pub clock: ClockConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// Weight of the implicit neutral observation blended into every score
    pub prior_weight: f64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self { prior_weight: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BetrayalConfig {
    /// Cumulative negative cycle risk at which a cycle is critical (score >= 0.9)
    pub critical_cycle_magnitude: f64,
    /// Live/expected reachability ratio below which coverage is flagged
    pub min_coverage: f64,
    /// Upper bound on belief propagation rounds
    pub bp_max_iterations: usize,
    /// Maximum per-round belief delta that counts as converged
    pub bp_tolerance: f64,
}

impl Default for BetrayalConfig {
    fn default() -> Self {
        Self {
            critical_cycle_magnitude: 1.0,
            min_coverage: 0.5,
            bp_max_iterations: 50,
            bp_tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProofConfig {
    /// Longest path a proof may claim
    pub max_hops: u16,
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self { max_hops: 64 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub mode: ClockMode,
}

impl QvlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| QvlError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make scoring or detection meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(self.reputation.prior_weight.is_finite() && self.reputation.prior_weight > 0.0) {
            return Err(QvlError::Config(format!(
                "reputation.prior_weight must be > 0, got {}",
                self.reputation.prior_weight
            )));
        }
        let b = &self.betrayal;
        if !(b.critical_cycle_magnitude.is_finite() && b.critical_cycle_magnitude > 0.0) {
            return Err(QvlError::Config(format!(
                "betrayal.critical_cycle_magnitude must be > 0, got {}",
                b.critical_cycle_magnitude
            )));
        }
        if !(0.0..=1.0).contains(&b.min_coverage) {
            return Err(QvlError::Config(format!(
                "betrayal.min_coverage must be within [0, 1], got {}",
                b.min_coverage
            )));
        }
        if b.bp_max_iterations == 0 {
            return Err(QvlError::Config(
                "betrayal.bp_max_iterations must be at least 1".to_string(),
            ));
        }
        if !(b.bp_tolerance.is_finite() && b.bp_tolerance > 0.0 && b.bp_tolerance < 1.0) {
            return Err(QvlError::Config(format!(
                "betrayal.bp_tolerance must be within (0, 1), got {}",
                b.bp_tolerance
            )));
        }
        if self.proof.max_hops == 0 {
            return Err(QvlError::Config("proof.max_hops must be at least 1".to_string()));
        }
        Ok(())
    }
}

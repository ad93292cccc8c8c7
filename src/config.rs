use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::error::QuantizeError;
use crate::core::palette::{PaletteOptions, MAX_PALETTE_SIZE};
use crate::core::vector::Norm;

/// When the round driver stops.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StopPolicy {
    /// Run exactly `rounds` rounds.
    #[default]
    Fixed,
    /// Stop once a round neither shifts nor splits, at most `rounds` rounds.
    Converge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizeConfig {
    pub colors: usize,
    pub metric: Norm,
    pub imbalance_factor: usize,
    pub min_spread: f64,
    pub split_fraction: f64,
    pub shift_epsilon: f64,
    pub stop: StopPolicy,
    pub rounds: usize,
    pub skip_final_split: bool,
    pub seed: Option<u64>,
    pub threads: Option<usize>,
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            colors: 64,
            metric: Norm::Euclidean,
            imbalance_factor: 3,
            min_spread: 3.0,
            split_fraction: 0.01,
            shift_epsilon: 1.0,
            stop: StopPolicy::Fixed,
            rounds: 5,
            skip_final_split: true,
            seed: None,
            threads: None,
        }
    }
}

impl QuantizeConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), QuantizeError> {
        if self.colors == 0 || self.colors > MAX_PALETTE_SIZE {
            return Err(QuantizeError::InvalidPaletteSize {
                got: self.colors,
                max: MAX_PALETTE_SIZE,
            });
        }
        if self.rounds == 0 {
            return Err(QuantizeError::InvalidConfig("rounds must be at least 1".into()));
        }
        if self.imbalance_factor == 0 {
            return Err(QuantizeError::InvalidConfig(
                "imbalance_factor must be at least 1".into(),
            ));
        }
        if !self.min_spread.is_finite() || self.min_spread < 0.0 {
            return Err(QuantizeError::InvalidConfig(format!(
                "min_spread must be a non-negative number, got {}",
                self.min_spread
            )));
        }
        if !self.shift_epsilon.is_finite() || self.shift_epsilon < 0.0 {
            return Err(QuantizeError::InvalidConfig(format!(
                "shift_epsilon must be a non-negative number, got {}",
                self.shift_epsilon
            )));
        }
        if !self.split_fraction.is_finite() || self.split_fraction <= 0.0 {
            return Err(QuantizeError::InvalidConfig(format!(
                "split_fraction must be positive, got {}",
                self.split_fraction
            )));
        }
        if self.threads == Some(0) {
            return Err(QuantizeError::InvalidConfig("threads must be at least 1".into()));
        }
        Ok(())
    }

    pub fn palette_options(&self) -> PaletteOptions {
        PaletteOptions {
            metric: self.metric,
            imbalance_factor: self.imbalance_factor,
            min_spread: self.min_spread,
            split_fraction: self.split_fraction,
            shift_epsilon: self.shift_epsilon,
        }
    }

    pub fn num_threads(&self) -> usize {
        self.threads.unwrap_or_else(|| num_cpus::get().max(1))
    }
}

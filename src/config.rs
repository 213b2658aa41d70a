// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Bus Ring Payment Simulator - Sweep Configuration
//
// Parameter sweep definition. Every field has a default equal to the
// reference campaign, so an empty YAML document describes the full sweep.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file invalid: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid sweep config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// USD per gas unit.
pub const DEFAULT_GAS_PRICE: f64 = 0.0000598392;
/// Gas of one confirmation.
pub const DEFAULT_CONFIRMATION_GAS: u64 = 50_056;
/// Starting wallet per user in USD.
pub const DEFAULT_WALLET: f64 = 6602.23;
pub const DEFAULT_EPOCHS: u32 = 20;
pub const DEFAULT_RUNS: u64 = 30;
/// Smallest accepted hop. Dataset clocks are epoch milliseconds (~1.6e12),
/// where f64 steps are about 2.4e-4 ms.
pub const MIN_HOP_TIME_MS: f64 = 1.0;

fn default_cooperative_users() -> Vec<usize> {
    vec![100]
}

fn default_non_cooperative_percent() -> Vec<usize> {
    vec![30]
}

fn default_collaboration_levels() -> Vec<f64> {
    vec![0.0, 0.3, 0.6, 0.9, 1.0]
}

fn default_hop_times_ms() -> Vec<f64> {
    (1..=21).map(|i| i as f64 * 10_000.0).collect()
}

fn default_deposit_percentages() -> Vec<f64> {
    (1..=196).step_by(5).map(f64::from).collect()
}

fn default_runs() -> u64 {
    DEFAULT_RUNS
}

fn default_epochs() -> u32 {
    DEFAULT_EPOCHS
}

fn default_wallet() -> f64 {
    DEFAULT_WALLET
}

fn default_gas_price() -> f64 {
    DEFAULT_GAS_PRICE
}

fn default_confirmation_gas() -> u64 {
    DEFAULT_CONFIRMATION_GAS
}

// ---------------------------------------------------------------------------
// SweepConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Fully cooperative users per ring (k).
    #[serde(default = "default_cooperative_users")]
    pub cooperative_users: Vec<usize>,
    /// Extra non-cooperative users, as a percentage of k.
    #[serde(default = "default_non_cooperative_percent")]
    pub non_cooperative_percent: Vec<usize>,
    /// Collaboration probability of the non-cooperative users.
    #[serde(default = "default_collaboration_levels")]
    pub collaboration_levels: Vec<f64>,
    #[serde(default = "default_hop_times_ms")]
    pub hop_times_ms: Vec<f64>,
    /// Total deposit as a percentage of the ring's total wallet.
    #[serde(default = "default_deposit_percentages")]
    pub deposit_percentages: Vec<f64>,
    #[serde(default = "default_runs")]
    pub runs: u64,
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    #[serde(default = "default_wallet")]
    pub wallet_per_user: f64,
    #[serde(default = "default_gas_price")]
    pub gas_price: f64,
    #[serde(default = "default_confirmation_gas")]
    pub confirmation_gas: u64,
    /// Run `r` uses seed `base_seed + r`.
    #[serde(default)]
    pub base_seed: u64,
    /// Worker threads; `None` lets rayon decide.
    #[serde(default)]
    pub threads: Option<usize>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            cooperative_users: default_cooperative_users(),
            non_cooperative_percent: default_non_cooperative_percent(),
            collaboration_levels: default_collaboration_levels(),
            hop_times_ms: default_hop_times_ms(),
            deposit_percentages: default_deposit_percentages(),
            runs: DEFAULT_RUNS,
            epochs: DEFAULT_EPOCHS,
            wallet_per_user: DEFAULT_WALLET,
            gas_price: DEFAULT_GAS_PRICE,
            confirmation_gas: DEFAULT_CONFIRMATION_GAS,
            base_seed: 0,
            threads: None,
        }
    }
}

impl SweepConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.cooperative_users.is_empty()
            || self.non_cooperative_percent.is_empty()
            || self.collaboration_levels.is_empty()
            || self.hop_times_ms.is_empty()
            || self.deposit_percentages.is_empty()
        {
            return invalid("every sweep axis needs at least one value");
        }
        if self.cooperative_users.contains(&0) {
            return invalid("cooperative_users must be positive");
        }
        if self
            .collaboration_levels
            .iter()
            .any(|l| !(0.0..=1.0).contains(l))
        {
            return invalid("collaboration_levels must lie in [0, 1]");
        }
        if self.hop_times_ms.iter().any(|h| !(*h >= MIN_HOP_TIME_MS)) {
            return invalid("hop_times_ms must be at least 1 ms");
        }
        if self.deposit_percentages.iter().any(|d| !(*d >= 0.0)) {
            return invalid("deposit_percentages must be non-negative");
        }
        if self.runs == 0 {
            return invalid("runs must be at least 1");
        }
        if self.epochs == 0 {
            return invalid("epochs must be at least 1");
        }
        if !(self.wallet_per_user > 0.0) {
            return invalid("wallet_per_user must be positive");
        }
        if !(self.gas_price >= 0.0) {
            return invalid("gas_price must be non-negative");
        }
        if self.threads == Some(0) {
            return invalid("threads must be at least 1");
        }
        Ok(())
    }

    /// USD cost of one confirmation.
    pub fn confirm_cost(&self) -> f64 {
        self.confirmation_gas as f64 * self.gas_price
    }

    /// Number of configurations the sweep produces.
    pub fn configuration_count(&self) -> usize {
        self.cooperative_users.len()
            * self.non_cooperative_percent.len()
            * self.collaboration_levels.len()
            * self.hop_times_ms.len()
            * self.deposit_percentages.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_campaign() {
        let config = SweepConfig::default();
        assert_eq!(config.hop_times_ms.len(), 21);
        assert_eq!(config.hop_times_ms[0], 10_000.0);
        assert_eq!(config.hop_times_ms[20], 210_000.0);
        assert_eq!(config.deposit_percentages.len(), 40);
        assert_eq!(config.deposit_percentages[0], 1.0);
        assert_eq!(config.deposit_percentages[39], 196.0);
        assert_eq!(config.configuration_count(), 5 * 21 * 40);
        assert!((config.confirm_cost() - 50_056.0 * 0.0000598392).abs() < 1e-12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_document_is_the_default() {
        let config = SweepConfig::from_yaml_str("{}").expect("test: parse empty config");
        assert_eq!(config, SweepConfig::default());
    }

    #[test]
    fn partial_override() {
        let yaml = "
cooperative_users: [10]
collaboration_levels: [0.5]
hop_times_ms: [1000]
deposit_percentages: [50]
runs: 2
base_seed: 7
";
        let config = SweepConfig::from_yaml_str(yaml).expect("test: parse config");
        assert_eq!(config.cooperative_users, vec![10]);
        assert_eq!(config.non_cooperative_percent, vec![30]);
        assert_eq!(config.runs, 2);
        assert_eq!(config.base_seed, 7);
        assert_eq!(config.configuration_count(), 1);
    }

    #[test]
    fn rejects_out_of_range_level() {
        let err = SweepConfig::from_yaml_str("collaboration_levels: [1.5]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_sub_millisecond_hop() {
        let err = SweepConfig::from_yaml_str("hop_times_ms: [10000, 0.0005]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(SweepConfig::from_yaml_str("hop_times_ms: [1.0]").is_ok());
    }

    #[test]
    fn rejects_empty_axis() {
        let err = SweepConfig::from_yaml_str("hop_times_ms: []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_field() {
        let err = SweepConfig::from_yaml_str("hop_time: 5").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("test: tempdir");
        let path = dir.path().join("sweep.yaml");
        fs::write(&path, "runs: 3\nepochs: 4\n").expect("test: write config");
        let config = SweepConfig::from_yaml_file(&path).expect("test: load config");
        assert_eq!(config.runs, 3);
        assert_eq!(config.epochs, 4);
    }
}

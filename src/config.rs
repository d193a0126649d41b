//! Configuration Registry: per-variant detection parameters.
//!
//! A frozen, validated, process-wide record of per-variant parameters.
//! A `serde::Deserialize` struct with `#[serde(default)]` sections and a
//! TOML loader that falls back to defaults, plus [`Config::validate`] so
//! malformed configuration (an empty denomination set, an out-of-range
//! threshold, an empty pool list) fails engine construction instead of
//! silently producing nonsense verdicts later.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub confidence_threshold: f64,
    pub joinmarket_equal_tolerance_sat: u64,
    pub wasabi_1_0: Wasabi1Config,
    pub wasabi_1_1: Wasabi1_1Config,
    pub wasabi_2_0: Wasabi2Config,
    pub whirlpool_pools: Vec<WhirlpoolPool>,
    pub whirlpool_tx0: WhirlpoolTx0Config,
    pub whirlpool_mix: WhirlpoolMixConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Wasabi1Config {
    pub target: u64,
    pub epsilon: u64,
    pub amax: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Wasabi1_1Config {
    pub target: u64,
    pub epsilon: u64,
    pub amax: u64,
    pub max_mixing_level: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Wasabi2Config {
    pub denominations: Vec<u64>,
    pub amax: u64,
    pub vmin: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WhirlpoolPool {
    pub denomination: u64,
    pub coordinator_fee: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WhirlpoolTx0Config {
    pub amax: u64,
    pub eta1: f64,
    pub eta2: f64,
    pub epsilon_min: u64,
    pub epsilon_max: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WhirlpoolMixConfig {
    pub epsilon_max: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            joinmarket_equal_tolerance_sat: 1_000,
            wasabi_1_0: Wasabi1Config::default(),
            wasabi_1_1: Wasabi1_1Config::default(),
            wasabi_2_0: Wasabi2Config::default(),
            whirlpool_pools: default_whirlpool_pools(),
            whirlpool_tx0: WhirlpoolTx0Config::default(),
            whirlpool_mix: WhirlpoolMixConfig::default(),
        }
    }
}

impl Default for Wasabi1Config {
    fn default() -> Self {
        Self {
            target: 10_000_000,
            epsilon: 1_000_000,
            amax: 10,
        }
    }
}

impl Default for Wasabi1_1Config {
    fn default() -> Self {
        Self {
            target: 10_000_000,
            epsilon: 1_000_000,
            amax: 10,
            max_mixing_level: 3,
        }
    }
}

impl Default for Wasabi2Config {
    fn default() -> Self {
        Self {
            denominations: vec![
                50_000, 100_000, 200_000, 500_000, 1_000_000, 2_000_000, 5_000_000, 10_000_000,
            ],
            amax: 10,
            vmin: 5_000,
        }
    }
}

fn default_whirlpool_pools() -> Vec<WhirlpoolPool> {
    vec![
        WhirlpoolPool {
            denomination: 100_000,
            coordinator_fee: 5_000,
        },
        WhirlpoolPool {
            denomination: 1_000_000,
            coordinator_fee: 50_000,
        },
        WhirlpoolPool {
            denomination: 5_000_000,
            coordinator_fee: 175_000,
        },
        WhirlpoolPool {
            denomination: 50_000_000,
            coordinator_fee: 1_750_000,
        },
    ]
}

impl Default for WhirlpoolTx0Config {
    fn default() -> Self {
        Self {
            amax: 70,
            eta1: 0.5,
            eta2: 3.0,
            epsilon_min: 100,
            epsilon_max: 100_000,
        }
    }
}

impl Default for WhirlpoolMixConfig {
    fn default() -> Self {
        Self {
            epsilon_max: 100_000,
        }
    }
}

impl Config {
    /// Construct and validate a configuration: an empty denomination set,
    /// an out-of-range threshold, an empty pool list, or a negative
    /// Whirlpool Tx0 fee multiplier fail construction rather than surfacing
    /// as a per-transaction error.
    pub fn build(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.confidence_threshold));
        }
        if self.wasabi_2_0.denominations.is_empty() {
            return Err(ConfigError::EmptyDenominationSet);
        }
        if self.whirlpool_pools.is_empty() {
            return Err(ConfigError::EmptyPoolList);
        }
        if self.whirlpool_tx0.eta1 < 0.0 {
            return Err(ConfigError::NegativeBound {
                field: "whirlpool_tx0.eta1",
                value: self.whirlpool_tx0.eta1,
            });
        }
        if self.whirlpool_tx0.eta2 < 0.0 {
            return Err(ConfigError::NegativeBound {
                field: "whirlpool_tx0.eta2",
                value: self.whirlpool_tx0.eta2,
            });
        }
        Ok(())
    }

    /// Load a configuration from a TOML file, falling back to
    /// [`Config::default`] on a missing or malformed file. The result is
    /// still validated before use; a malformed-but-parseable file that
    /// fails validation is reported via the returned `Result`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = if !path.exists() {
            tracing::info!("Config file {} not found, using defaults", path.display());
            Config::default()
        } else {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => {
                        tracing::info!("Config loaded from {}", path.display());
                        config
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {e}, using defaults", path.display());
                        Config::default()
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {e}, using defaults", path.display());
                    Config::default()
                }
            }
        };
        config.build()
    }
}

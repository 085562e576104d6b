// src/config/config.rs
use crate::{
    network::{
        feeds::{DifficultyFeedConfig, MarketFeedConfig},
        rig::RigConfig,
    },
    types::PenaltyFactor,
    utils::error::SwitchError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the pool chooser
///
/// Loaded once at startup and never modified afterwards. The hash rate the
/// loop actually uses starts at `fallback_hash_rate` and is then tracked by
/// the control loop itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hash rate (H/s) assumed until the rig reports one
    pub fallback_hash_rate: f64,

    /// Minimum rating ratio over the active currency before switching
    /// (default: 1.1)
    #[serde(default = "default_switch_threshold")]
    pub switch_threshold: f64,

    /// Seconds to wait after a failed cycle (default: 30)
    #[serde(default = "default_retry_interval")]
    pub retry_interval: u64,

    /// Seconds to wait after a successful cycle (default: 300)
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval: u64,

    /// Restart the rig before submitting a new pool order
    #[serde(default)]
    pub restart_on_pool_change: bool,

    /// Seconds to wait for the rig after a restart; 0 waits forever
    /// (default: 120)
    #[serde(default = "default_restart_timeout")]
    pub restart_timeout: u64,

    /// Milliseconds between liveness probes after a restart (default: 1000)
    #[serde(default = "default_restart_poll_interval")]
    pub restart_poll_interval_ms: u64,

    /// Rig API connection
    #[serde(default)]
    pub rig: RigConfig,

    /// Market quote feed
    pub market: MarketFeedConfig,

    /// Difficulty feed
    pub difficulty: DifficultyFeedConfig,

    /// Rating pipeline
    #[serde(default)]
    pub rating: RatingConfig,

    /// Pool URL to currency tag
    #[serde(default)]
    pub pool_currency: BTreeMap<String, String>,
}

/// Rating pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingConfig {
    /// Penalty factors in application order
    #[serde(default = "default_penalties")]
    pub penalties: Vec<PenaltyFactor>,
}

impl Default for RatingConfig {
    fn default() -> Self {
        RatingConfig {
            penalties: default_penalties(),
        }
    }
}

fn default_switch_threshold() -> f64 {
    1.1
}

fn default_retry_interval() -> u64 {
    30
}

fn default_cycle_interval() -> u64 {
    300
}

fn default_restart_timeout() -> u64 {
    120
}

fn default_restart_poll_interval() -> u64 {
    1000
}

fn default_penalties() -> Vec<PenaltyFactor> {
    PenaltyFactor::ALL.to_vec()
}

impl Config {
    /// Loads configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded and validated configuration
    /// * `Err(SwitchError)` - If file couldn't be read, parsed or validated
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SwitchError> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path).map_err(|e| {
            SwitchError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&config_str)
    }

    /// Parses and validates configuration from TOML text
    pub fn parse(config_str: &str) -> Result<Self, SwitchError> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), SwitchError> {
        if !(self.fallback_hash_rate.is_finite() && self.fallback_hash_rate > 0.0) {
            return Err(SwitchError::ConfigError(format!(
                "fallback_hash_rate must be positive, got {}",
                self.fallback_hash_rate
            )));
        }
        if !(self.switch_threshold.is_finite() && self.switch_threshold > 1.0) {
            return Err(SwitchError::ConfigError(format!(
                "switch_threshold must be greater than 1, got {}",
                self.switch_threshold
            )));
        }
        if self.cycle_interval == 0 {
            return Err(SwitchError::ConfigError(
                "cycle_interval must be at least 1 second".into(),
            ));
        }
        if self.pool_currency.is_empty() {
            log::warn!("pool_currency is empty; no pool can be matched to a currency");
        }
        Ok(())
    }

    /// Pause after a successful cycle
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval)
    }

    /// Pause after a failed cycle
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval)
    }

    /// Upper bound on the post-restart wait, `None` for unbounded
    pub fn restart_timeout(&self) -> Option<Duration> {
        (self.restart_timeout > 0).then(|| Duration::from_secs(self.restart_timeout))
    }

    /// Pause between post-restart liveness probes
    pub fn restart_poll_interval(&self) -> Duration {
        Duration::from_millis(self.restart_poll_interval_ms)
    }

    /// Generates a configuration template string
    ///
    /// # Returns
    /// String containing a commented TOML configuration template
    pub fn generate_template() -> String {
        let mut template = String::new();
        template.push_str("# Pool chooser configuration\n\n");
        template.push_str("# Hash rate (H/s) assumed until the rig reports one\n");
        template.push_str("fallback_hash_rate = 2000000.0\n");
        template.push_str("# Switch only when the best coin rates this many times the active one\n");
        template.push_str("switch_threshold = 1.1\n");
        template.push_str("# Seconds between cycles, and after a failed cycle\n");
        template.push_str("cycle_interval = 300\n");
        template.push_str("retry_interval = 30\n");
        template.push_str("# Restart the rig before changing pool priority\n");
        template.push_str("restart_on_pool_change = false\n");
        template.push_str("# Seconds to wait for the rig after a restart (0 = forever)\n");
        template.push_str("restart_timeout = 120\n");
        template.push_str("restart_poll_interval_ms = 1000\n\n");

        template.push_str("[rig]\n");
        template.push_str("host = \"127.0.0.1\"\n");
        template.push_str("port = 4028\n");
        template.push_str("timeout = 5\n\n");

        template.push_str("[market]\n");
        template.push_str("cache_file = \"cryptsy.json\"\n");
        template.push_str("cache_expiry = 300\n\n");

        template.push_str("[difficulty]\n");
        template.push_str("cache_file = \"coinwarz.json\"\n");
        template.push_str("cache_expiry = 1800\n");
        template.push_str("apikey = \"your_api_key\"\n");
        template.push_str("algo = \"scrypt\"\n\n");

        template.push_str("[rating]\n");
        template.push_str("# Any subset of: exchange_volume, profit_growth, difficulty\n");
        template.push_str("penalties = [\"exchange_volume\", \"profit_growth\", \"difficulty\"]\n\n");

        template.push_str("# Pool URL -> currency tag\n");
        template.push_str("[pool_currency]\n");
        template.push_str("\"stratum+tcp://ltc.example.com:3333\" = \"LTC\"\n");
        template.push_str("\"stratum+tcp://ftc.example.com:3333\" = \"FTC\"\n");

        template
    }
}

//! Configuration management for deskd.
//!
//! Loads settings from /etc/deskd/config.toml or uses defaults. All
//! values are read once at startup and fixed for the process lifetime.
//! An explicitly-requested config path that cannot be read is the one
//! fatal startup error this subsystem has.

use anyhow::{ensure, Context, Result};
use desk_common::ticket::FieldLimits;
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{info, warn};

/// Config file path.
pub const CONFIG_PATH: &str = "/etc/deskd/config.toml";

/// Queue sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of tickets in the queue.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Log a warning when occupancy crosses this percentage.
    #[serde(default = "default_warning_threshold_pct")]
    pub warning_threshold_pct: u8,
}

fn default_capacity() -> usize {
    10_000
}

fn default_warning_threshold_pct() -> u8 {
    80
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            warning_threshold_pct: default_warning_threshold_pct(),
        }
    }
}

/// Time-based escalation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Hours between automatic one-step promotions.
    #[serde(default = "default_cycle_hours")]
    pub cycle_hours: u64,

    /// Force Critical after this many hours regardless of history.
    #[serde(default = "default_safety_net_hours")]
    pub safety_net_hours: u64,
}

fn default_cycle_hours() -> u64 {
    24
}

fn default_safety_net_hours() -> u64 {
    72
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            cycle_hours: default_cycle_hours(),
            safety_net_hours: default_safety_net_hours(),
        }
    }
}

/// Duplicate suppression tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeConfig {
    /// Characters of the issue description compared for similarity.
    #[serde(default = "default_prefix_len")]
    pub prefix_len: usize,

    /// Days to look back in the resolved archive.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u64,
}

fn default_prefix_len() -> usize {
    30
}

fn default_lookback_days() -> u64 {
    7
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            prefix_len: default_prefix_len(),
            lookback_days: default_lookback_days(),
        }
    }
}

/// Control loop cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Sleep between cycles in milliseconds.
    #[serde(default = "default_sleep_ms")]
    pub sleep_ms: u64,

    /// Publish the snapshot every N cycles.
    #[serde(default = "default_publish_interval")]
    pub publish_interval_cycles: u64,

    /// Emit a console status line every N cycles.
    #[serde(default = "default_stats_interval")]
    pub stats_interval_cycles: u64,

    /// Prior resolved tickets shown per customer in the snapshot.
    #[serde(default = "default_history_max")]
    pub customer_history_max: usize,
}

fn default_sleep_ms() -> u64 {
    500
}

fn default_publish_interval() -> u64 {
    4
}

fn default_stats_interval() -> u64 {
    30
}

fn default_history_max() -> usize {
    10
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            sleep_ms: default_sleep_ms(),
            publish_interval_cycles: default_publish_interval(),
            stats_interval_cycles: default_stats_interval(),
            customer_history_max: default_history_max(),
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub escalation: EscalationConfig,

    #[serde(default)]
    pub dedupe: DedupeConfig,

    #[serde(default)]
    pub main_loop: LoopConfig,

    #[serde(default)]
    pub limits: FieldLimits,
}

impl Config {
    /// Load config from the default path, or return defaults.
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_PATH).unwrap_or_else(|e| {
            warn!("Config unusable, using defaults: {:#}", e);
            Config::default()
        })
    }

    /// Load config from a caller-supplied path. Unlike `load`, failure
    /// here is an error: an operator who named a file wants that file.
    pub fn load_required(path: &str) -> Result<Self> {
        Self::load_from_path(path).with_context(|| format!("cannot read config {}", path))
    }

    fn load_from_path(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded config from {}", path);
        Ok(config)
    }

    /// Reject values the engine cannot run with. Caught at startup so
    /// they surface as a readable config error, not a failure deep in
    /// engine construction.
    fn validate(&self) -> Result<()> {
        ensure!(self.queue.capacity > 0, "queue.capacity must be at least 1");
        ensure!(
            self.escalation.cycle_hours > 0,
            "escalation.cycle_hours must be at least 1"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.queue.capacity, 10_000);
        assert_eq!(config.escalation.cycle_hours, 24);
        assert_eq!(config.escalation.safety_net_hours, 72);
        assert_eq!(config.dedupe.prefix_len, 30);
        assert_eq!(config.dedupe.lookback_days, 7);
        assert_eq!(config.main_loop.sleep_ms, 500);
        assert_eq!(config.main_loop.publish_interval_cycles, 4);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[queue]
capacity = 50

[escalation]
cycle_hours = 12

[main_loop]
sleep_ms = 100
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.queue.capacity, 50);
        assert_eq!(config.escalation.cycle_hours, 12);
        assert_eq!(config.main_loop.sleep_ms, 100);
        // Defaults for missing fields
        assert_eq!(config.escalation.safety_net_hours, 72);
        assert_eq!(config.queue.warning_threshold_pct, 80);
        assert_eq!(config.limits.issue_description, 200);
    }

    #[test]
    fn test_required_path_missing_is_error() {
        assert!(Config::load_required("/nonexistent/deskd.toml").is_err());
    }

    #[test]
    fn test_zero_capacity_rejected_at_load() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[queue]\ncapacity = 0\n").unwrap();

        let err = Config::load_required(path.to_str().unwrap()).unwrap_err();
        assert!(format!("{:#}", err).contains("queue.capacity"));
    }
}

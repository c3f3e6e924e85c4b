//! Engine configuration.
//!
//! [`EngineConfig`] carries every tunable the engine reads at startup. Values
//! are layered: built-in defaults, then an optional config file, then
//! `TETHER_*` environment variables (`__` separates nested keys).

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use tether_consensus::ConsensusSettings;
use tether_core::constants::{
    CONSENSUS_REFRESH_SECS, DEFAULT_MIN_VOTES, DEFAULT_REPEAT_WINDOWS,
    DEFAULT_RETAIN_SCORED_ENTRIES, DEFAULT_SHARD_COUNT, INCIDENT_MIN_WEIGHT, SMOOTH_PRIOR_WEIGHT,
    SMOOTH_WINDOW_DAYS,
};
use tether_core::error::TetherError;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TETHER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root directory for all persistent data.
    pub data_dir: PathBuf,
    /// Log level filter string (e.g. "info", "tether_node=debug").
    pub log_level: String,
    /// "text" or "json".
    pub log_format: String,
    pub shard_count: u32,
    pub consensus_refresh_secs: i64,
    /// Votes of a type needed before community consensus overrides a default.
    pub min_votes: u64,
    pub incident_min_weight: f64,
    /// Days a value-assessment answer keeps contributing.
    pub repeat_windows: u32,
    /// Scored entries kept per pair after a rescoring pass.
    pub retain_scored_entries: usize,
    pub smoothing_window_days: u32,
    pub smoothing_prior_weight: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tether");

        Self {
            data_dir,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            shard_count: DEFAULT_SHARD_COUNT,
            consensus_refresh_secs: CONSENSUS_REFRESH_SECS,
            min_votes: DEFAULT_MIN_VOTES,
            incident_min_weight: INCIDENT_MIN_WEIGHT,
            repeat_windows: DEFAULT_REPEAT_WINDOWS,
            retain_scored_entries: DEFAULT_RETAIN_SCORED_ENTRIES,
            smoothing_window_days: SMOOTH_WINDOW_DAYS,
            smoothing_prior_weight: SMOOTH_PRIOR_WEIGHT,
        }
    }
}

impl EngineConfig {
    /// Load defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, TetherError> {
        let defaults = ::config::Config::try_from(&Self::default()).map_err(config_err)?;
        let mut builder = ::config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        let config: Self = builder
            .build()
            .map_err(config_err)?
            .try_deserialize()
            .map_err(config_err)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), TetherError> {
        if self.shard_count == 0 {
            return Err(TetherError::Config("shard_count must be positive".into()));
        }
        if self.consensus_refresh_secs < 0 {
            return Err(TetherError::Config("consensus_refresh_secs must not be negative".into()));
        }
        if !(-1.0..=0.0).contains(&self.incident_min_weight) {
            return Err(TetherError::Config(format!(
                "incident_min_weight {} outside [-1, 0]",
                self.incident_min_weight
            )));
        }
        if self.smoothing_window_days == 0 {
            return Err(TetherError::Config("smoothing_window_days must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.smoothing_prior_weight) {
            return Err(TetherError::Config(format!(
                "smoothing_prior_weight {} outside [0, 1]",
                self.smoothing_prior_weight
            )));
        }
        Ok(())
    }

    /// Path to the RocksDB score data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("scoredata")
    }

    pub fn consensus_settings(&self) -> ConsensusSettings {
        ConsensusSettings {
            refresh_interval: Duration::seconds(self.consensus_refresh_secs),
            min_votes: self.min_votes,
        }
    }
}

fn config_err(e: ::config::ConfigError) -> TetherError {
    TetherError::Config(e.to_string())
}

//! Updater configuration, loaded from TOML.
//!
//! Every field has a default matching the conventional data layout, so an
//! empty file (or no file at all) is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use barkeep_core::domain::{Interval, UtcOffset};
use barkeep_core::reconcile::DEFAULT_SAMPLE_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Paths and knobs for one updater run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdaterConfig {
    /// Root of the bulk exports, one subdirectory per interval.
    pub snapshot_dir: PathBuf,

    /// Root of the per-symbol series files, one subdirectory per interval.
    pub series_dir: PathBuf,

    /// Tracked-symbol list (`ticker` CSV or `symbols = [...]` TOML).
    pub universe_file: PathBuf,

    /// Where problem lists are written.
    pub problem_dir: PathBuf,

    /// Write `problematic_tickers_tw_{interval}.csv` after each run.
    pub problem_log: bool,

    /// Symbols drawn by the staleness sampler.
    pub sample_size: usize,

    /// Offset for rows of a series with no history.
    pub default_offset: UtcOffset,

    /// Intervals processed by `update --interval all`.
    pub intervals: Vec<Interval>,

    /// Sampler seed. Unset means a fresh seed each run.
    pub seed: Option<u64>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("data/tw_files"),
            series_dir: PathBuf::from("data/market_data_tw"),
            universe_file: PathBuf::from("data/tickers/combined_tickers.csv"),
            problem_dir: PathBuf::from("data/tickers"),
            problem_log: true,
            sample_size: DEFAULT_SAMPLE_SIZE,
            default_offset: UtcOffset::DEFAULT,
            intervals: Interval::ALL.to_vec(),
            seed: None,
        }
    }
}

impl UpdaterConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_size == 0 {
            return Err(ConfigError::Invalid("sample_size must be at least 1".into()));
        }
        if self.intervals.is_empty() {
            return Err(ConfigError::Invalid("intervals must not be empty".into()));
        }
        let mut seen = self.intervals.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != self.intervals.len() {
            return Err(ConfigError::Invalid("intervals must not repeat".into()));
        }
        if self.snapshot_dir == self.series_dir {
            return Err(ConfigError::Invalid(
                "snapshot_dir and series_dir must differ".into(),
            ));
        }
        Ok(())
    }

    /// Directory for problem lists, or `None` when the problem log is off.
    pub fn problem_log_dir(&self) -> Option<&Path> {
        self.problem_log.then_some(self.problem_dir.as_path())
    }

    /// `{snapshot_dir}/{interval}`
    pub fn snapshot_dir_for(&self, interval: Interval) -> PathBuf {
        self.snapshot_dir.join(interval.as_str())
    }
}

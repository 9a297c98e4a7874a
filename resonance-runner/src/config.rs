//! Serializable screener configuration.
//!
//! Every section is optional; an empty file yields the classic 5/10/20/5
//! windows, full-history screening and a 90-day backtest lookback.

use chrono::NaiveDate;
use resonance_core::{BacktestWindow, ResonanceParams, DEFAULT_LOOKBACK_DAYS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors from loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Unique identifier for a configuration (content-addressable hash).
pub type ConfigId = String;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScreenerConfig {
    pub indicators: ResonanceParams,
    pub screen: ScreenSection,
    pub backtest: BacktestSection,
}

/// Snapshot screening options.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScreenSection {
    /// Keep only each instrument's latest-dated row before applying the predicate.
    pub latest_only: bool,
}

/// Backtest options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BacktestSection {
    pub lookback_days: i64,
    /// Replay end date. When absent the caller supplies one.
    pub as_of: Option<NaiveDate>,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            as_of: None,
        }
    }
}

impl ScreenerConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.indicators
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.backtest.lookback_days < 0 {
            return Err(ConfigError::Invalid(format!(
                "backtest.lookback_days must be >= 0, got {}",
                self.backtest.lookback_days
            )));
        }
        match self.backtest.as_of {
            Some(as_of) => BacktestWindow::new(as_of, self.backtest.lookback_days)
                .validate()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?,
            // Without an end date, a lookback longer than the whole calendar
            // range is already unusable.
            None if self.backtest.lookback_days > (NaiveDate::MAX - NaiveDate::MIN).num_days() => {
                return Err(ConfigError::Invalid(format!(
                    "backtest.lookback_days {} exceeds the representable date range",
                    self.backtest.lookback_days
                )));
            }
            None => {}
        }
        Ok(())
    }

    /// Deterministic hash of this configuration.
    ///
    /// Two runs with identical configs share the same id in their reports.
    pub fn config_id(&self) -> ConfigId {
        // Plain data with string keys; serialization cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

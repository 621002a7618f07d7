//! Auction configuration
//!
//! Loaded from a JSON file; every field has a default so an empty
//! object is a valid configuration.
use crate::finalizer::DEFAULT_ROUND_LIMIT;
use crate::increment::IncrementPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {error}")]
    Io { path: String, error: String },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("round_limit must be at least 1")]
    ZeroRoundLimit,
    #[error("decision_timeout_ms must be positive")]
    ZeroTimeout,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedConfig {
    Json(PathBuf),
    Postgres(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionConfig {
    pub round_limit: u8,
    pub increment_tiers: IncrementPolicy,
    pub decision_timeout_ms: u64,
    pub interest_window: usize,
    /// Skip the current highest bidder when soliciting raises
    pub exclude_current_leader: bool,
    pub http_bind: Option<String>,
    pub seed: Option<SeedConfig>,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            round_limit: DEFAULT_ROUND_LIMIT,
            increment_tiers: IncrementPolicy::default(),
            decision_timeout_ms: 5_000,
            interest_window: 5,
            exclude_current_leader: true,
            http_bind: None,
            seed: None,
        }
    }
}

impl AuctionConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.round_limit == 0 {
            return Err(ConfigError::ZeroRoundLimit);
        }
        if self.decision_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }
}

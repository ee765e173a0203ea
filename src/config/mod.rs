//! Runtime configuration for the ingest CLI.
//!
//! Library callers pass `IngestOptions` directly; this module only maps
//! environment variables onto the handful of knobs the binary exposes,
//! with sensible development defaults.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Environment variable names. Public so tests and scripts can refer to
/// them.
pub const ENV_COMMUNITY: &str = "TOOLSCOUT_COMMUNITY";
pub const ENV_FETCH_CONCURRENCY: &str = "TOOLSCOUT_FETCH_CONCURRENCY";
pub const ENV_SOURCE_NAME: &str = "TOOLSCOUT_SOURCE_NAME";

const DEFAULT_COMMUNITY: &str = "general";
const DEFAULT_FETCH_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    community: String,
    fetch_concurrency: usize,
    source_name: Option<String>,
}

impl Config {
    pub fn new(
        community: impl Into<String>,
        fetch_concurrency: usize,
        source_name: Option<String>,
    ) -> Self {
        Self {
            community: community.into(),
            fetch_concurrency,
            source_name,
        }
    }

    /// Load from environment variables, falling back to development
    /// defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let community = env::var(ENV_COMMUNITY).unwrap_or_else(|_| DEFAULT_COMMUNITY.to_string());
        let fetch_concurrency = match env::var(ENV_FETCH_CONCURRENCY) {
            Ok(raw) => raw.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                field: ENV_FETCH_CONCURRENCY,
                reason: format!("expected a positive integer, got {raw:?}"),
            })?,
            Err(_) => DEFAULT_FETCH_CONCURRENCY,
        };
        if fetch_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: ENV_FETCH_CONCURRENCY,
                reason: "must be at least 1".to_string(),
            });
        }
        let source_name = env::var(ENV_SOURCE_NAME).ok();
        Ok(Self {
            community,
            fetch_concurrency,
            source_name,
        })
    }

    /// Community slug candidates are attributed to.
    pub fn community(&self) -> &str {
        &self.community
    }
    /// Maximum concurrent metadata fetches.
    pub fn fetch_concurrency(&self) -> usize {
        self.fetch_concurrency
    }
    /// Optional channel/group name recorded as provenance.
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_COMMUNITY, DEFAULT_FETCH_CONCURRENCY, None)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl Error for ConfigError {}

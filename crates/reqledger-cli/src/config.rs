//! `reqledger.toml` loading.
//!
//! ```toml
//! [ledger]
//! path = ".reqledger/ledger.jsonl"
//!
//! [events]
//! path = ".reqledger/events.jsonl"
//!
//! [logging]
//! level = "warn"
//! format = "text"   # or "json"
//! ```
//!
//! Every key is optional. Command-line flags override file values.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = ".reqledger/config.toml";
pub const DEFAULT_LEDGER_PATH: &str = ".reqledger/ledger.jsonl";
pub const DEFAULT_EVENTS_PATH: &str = ".reqledger/events.jsonl";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid config {path}: {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub ledger: LedgerSection,
    pub events: EventsSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerSection {
    pub path: String,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            path: DEFAULT_LEDGER_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventsSection {
    pub path: String,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            path: DEFAULT_EVENTS_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub ledger: Option<String>,
    pub events: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Load from `explicit`, or from the default path when present.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(path) = overrides.ledger {
            self.ledger.path = path;
        }
        if let Some(path) = overrides.events {
            self.events.path = path;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
        self
    }

    pub fn ledger_path(&self) -> PathBuf {
        PathBuf::from(&self.ledger.path)
    }

    pub fn events_path(&self) -> PathBuf {
        PathBuf::from(&self.events.path)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

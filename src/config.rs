//! Configuration management for chargesync
//!
//! Loads, validates and saves the YAML configuration. Each configured
//! ChargePoint account is a [`ConfigEntry`] holding the credentials, the
//! current session token and the user-selected options.

use crate::error::{ChargeSyncError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

mod defaults;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Directory searched for legacy side files (old session token file)
    pub config_dir: String,

    /// Configured accounts
    pub entries: Vec<ConfigEntry>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional override for the console layer
    pub console_level: Option<String>,

    /// Optional override for the file layer
    pub file_level: Option<String>,

    /// Path to log file (its directory receives the rolling files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

/// One configured account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigEntry {
    /// Stable identifier of the entry
    pub entry_id: String,

    /// Display title, the username by default
    pub title: String,

    /// Credentials and session token
    pub data: EntryData,

    /// User-selectable options
    #[serde(default)]
    pub options: EntryOptions,
}

/// Persisted account data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryData {
    pub username: String,
    pub password: String,

    /// Session token issued by the service; empty until the first login
    #[serde(default)]
    pub session_token: String,
}

/// Per-entry options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryOptions {
    /// Poll interval in seconds, one of [`PollInterval::ALL`]
    pub poll_interval: u64,
}

/// The poll intervals a user can pick from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollInterval {
    ThirtySeconds,
    OneMinute,
    ThreeMinutes,
    FiveMinutes,
    TenMinutes,
}

impl PollInterval {
    pub const ALL: [PollInterval; 5] = [
        PollInterval::ThirtySeconds,
        PollInterval::OneMinute,
        PollInterval::ThreeMinutes,
        PollInterval::FiveMinutes,
        PollInterval::TenMinutes,
    ];

    pub const DEFAULT: PollInterval = PollInterval::ThreeMinutes;

    pub fn seconds(self) -> u64 {
        match self {
            Self::ThirtySeconds => 30,
            Self::OneMinute => 60,
            Self::ThreeMinutes => 180,
            Self::FiveMinutes => 300,
            Self::TenMinutes => 600,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ThirtySeconds => "30 seconds",
            Self::OneMinute => "1 minute",
            Self::ThreeMinutes => "3 minutes",
            Self::FiveMinutes => "5 minutes",
            Self::TenMinutes => "10 minutes",
        }
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.seconds())
    }

    /// Exact match against the allowed values
    pub fn from_seconds(seconds: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.seconds() == seconds)
    }

    /// Like [`PollInterval::from_seconds`] but falls back to the default,
    /// logging the rejected value
    pub fn resolve(seconds: u64) -> Self {
        Self::from_seconds(seconds).unwrap_or_else(|| {
            tracing::warn!(
                "Invalid poll interval {}, using default {}",
                seconds,
                Self::DEFAULT.seconds()
            );
            Self::DEFAULT
        })
    }
}

impl ConfigEntry {
    /// Create a new entry with a fresh id and default options
    pub fn new(username: &str, password: &str, session_token: &str) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            title: username.to_string(),
            data: EntryData {
                username: username.to_string(),
                password: password.to_string(),
                session_token: session_token.to_string(),
            },
            options: EntryOptions::default(),
        }
    }

    /// Effective poll interval for this entry
    pub fn poll_interval(&self) -> PollInterval {
        PollInterval::resolve(self.options.poll_interval)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = [
            "chargesync.yaml",
            "/data/chargesync.yaml",
            "/etc/chargesync/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn entry(&self, entry_id: &str) -> Option<&ConfigEntry> {
        self.entries.iter().find(|e| e.entry_id == entry_id)
    }

    pub fn entry_mut(&mut self, entry_id: &str) -> Option<&mut ConfigEntry> {
        self.entries.iter_mut().find(|e| e.entry_id == entry_id)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.web.port == 0 {
            return Err(ChargeSyncError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            if entry.entry_id.trim().is_empty() {
                return Err(ChargeSyncError::validation(
                    "entries.entry_id",
                    "Entry id cannot be empty",
                ));
            }
            if !seen.insert(entry.entry_id.as_str()) {
                return Err(ChargeSyncError::validation(
                    "entries.entry_id".to_string(),
                    format!("Duplicate entry id {}", entry.entry_id),
                ));
            }
            if entry.data.username.trim().is_empty() {
                return Err(ChargeSyncError::validation(
                    "entries.data.username",
                    "Username cannot be empty",
                ));
            }
            if entry.data.password.is_empty() {
                return Err(ChargeSyncError::validation(
                    "entries.data.password",
                    "Password cannot be empty",
                ));
            }
        }

        Ok(())
    }
}

//! Persistence of config entries
//!
//! Coordinators and setup code write session tokens and option changes
//! through [`EntryStore`]. [`ConfigFileStore`] keeps the whole [`Config`] in
//! memory and rewrites the YAML file after every change.

use crate::config::{Config, ConfigEntry, EntryData, EntryOptions};
use crate::error::{ChargeSyncError, Result};
use crate::logging::{StructuredLogger, get_logger};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Side file used by older releases to hold the session token
pub const LEGACY_TOKEN_FILE_NAME: &str = "chargepoint_session.json";

/// Writable view of the configured accounts
pub trait EntryStore: Send + Sync {
    fn entry(&self, entry_id: &str) -> Option<ConfigEntry>;

    fn entries(&self) -> Vec<ConfigEntry>;

    /// Replace the stored session token of one entry
    fn update_session_token(&self, entry_id: &str, session_token: &str) -> Result<()>;

    fn update_options(&self, entry_id: &str, options: EntryOptions) -> Result<()>;

    /// Replace username, password and token after re-authentication
    fn update_credentials(&self, entry_id: &str, data: EntryData) -> Result<()>;
}

/// Entry store backed by the YAML configuration file
pub struct ConfigFileStore {
    path: Option<PathBuf>,
    config: Mutex<Config>,
    logger: StructuredLogger,
}

impl ConfigFileStore {
    /// Store that writes back to `path`
    pub fn new<P: AsRef<Path>>(path: P, config: Config) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            config: Mutex::new(config),
            logger: get_logger("persistence"),
        }
    }

    /// Load `path`, or start from defaults when the file does not exist yet
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = if path.as_ref().exists() {
            Config::from_file(&path)?
        } else {
            Config::default()
        };
        Ok(Self::new(path, config))
    }

    /// Store that never touches disk
    pub fn in_memory(config: Config) -> Self {
        Self {
            path: None,
            config: Mutex::new(config),
            logger: get_logger("persistence"),
        }
    }

    /// Copy of the current configuration
    pub fn config(&self) -> Result<Config> {
        Ok(self.lock()?.clone())
    }

    pub fn add_entry(&self, entry: ConfigEntry) -> Result<()> {
        let mut config = self.lock()?;
        if config.entry(&entry.entry_id).is_some() {
            return Err(ChargeSyncError::validation(
                "entry_id".to_string(),
                format!("Entry {} already exists", entry.entry_id),
            ));
        }
        let mut updated = config.clone();
        updated.entries.push(entry);
        self.commit(&mut config, updated)
    }

    fn modify<F>(&self, entry_id: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut ConfigEntry),
    {
        let mut config = self.lock()?;
        let mut updated = config.clone();
        let entry = updated
            .entry_mut(entry_id)
            .ok_or_else(|| ChargeSyncError::not_found(format!("Config entry {}", entry_id)))?;
        apply(entry);
        self.commit(&mut config, updated)
    }

    /// Write `updated` and only then make it the in-memory configuration
    fn commit(&self, current: &mut Config, updated: Config) -> Result<()> {
        if let Some(path) = &self.path {
            if let Err(e) = updated.save_to_file(path) {
                self.logger.error(&format!(
                    "Failed to save configuration to {}: {}",
                    path.display(),
                    e
                ));
                return Err(e);
            }
            self.logger
                .debug(&format!("Saved configuration to {}", path.display()));
        }
        *current = updated;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Config>> {
        self.config
            .lock()
            .map_err(|_| ChargeSyncError::generic("Configuration lock poisoned"))
    }
}

impl EntryStore for ConfigFileStore {
    fn entry(&self, entry_id: &str) -> Option<ConfigEntry> {
        self.lock().ok()?.entry(entry_id).cloned()
    }

    fn entries(&self) -> Vec<ConfigEntry> {
        self.lock().map(|c| c.entries.clone()).unwrap_or_default()
    }

    fn update_session_token(&self, entry_id: &str, session_token: &str) -> Result<()> {
        self.modify(entry_id, |entry| {
            entry.data.session_token = session_token.to_string();
        })?;
        self.logger
            .info(&format!("Stored new session token for entry {}", entry_id));
        Ok(())
    }

    fn update_options(&self, entry_id: &str, options: EntryOptions) -> Result<()> {
        self.modify(entry_id, |entry| entry.options = options)
    }

    fn update_credentials(&self, entry_id: &str, data: EntryData) -> Result<()> {
        self.modify(entry_id, |entry| {
            entry.title = data.username.clone();
            entry.data = data;
        })
    }
}

/// One-time cleanup of the legacy token side file.
///
/// The file's token is adopted only when `entry` has none of its own. The
/// file is removed either way. Returns whether a token was adopted.
pub fn migrate_legacy_token(config_dir: &Path, entry: &mut ConfigEntry) -> Result<bool> {
    let logger = get_logger("persistence");
    let path = config_dir.join(LEGACY_TOKEN_FILE_NAME);
    if !path.is_file() {
        return Ok(false);
    }

    let mut adopted = false;
    if entry.data.session_token.is_empty() {
        match read_legacy_token(&path) {
            Ok(Some(token)) => {
                entry.data.session_token = token;
                adopted = true;
                logger.info("Adopted session token from legacy token file");
            }
            Ok(None) => logger.warn("Legacy token file holds no session token"),
            Err(e) => logger.warn(&format!("Ignoring unreadable legacy token file: {}", e)),
        }
    }

    std::fs::remove_file(&path)?;
    logger.info(&format!("Removed legacy token file {}", path.display()));
    Ok(adopted)
}

fn read_legacy_token(path: &Path) -> Result<Option<String>> {
    let contents = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&contents)?;
    let token = match &value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => map
            .get("session_token")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        _ => None,
    };
    Ok(token.filter(|t| !t.is_empty()))
}

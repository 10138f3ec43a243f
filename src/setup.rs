//! Account lifecycle: setup, unload, options update and re-authentication
//!
//! Each configured account gets an [`AccountContext`] holding its client,
//! coordinator, entities and poll task. [`AccountManager`] owns those
//! contexts and is the only place they are looked up.

use crate::client::{ApiError, ClientConnector, LoginFailure};
use crate::config::{Config, ConfigEntry, EntryData, EntryOptions, PollInterval};
use crate::coordinator::UpdateCoordinator;
use crate::entities::{Entity, EntityAction, build_entities};
use crate::error::{ChargeSyncError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger, get_logger_with_context};
use crate::persistence::{EntryStore, migrate_legacy_token};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Everything that belongs to one configured account
pub struct AccountContext {
    entry_id: String,
    title: String,
    coordinator: Arc<UpdateCoordinator>,
    entities: Vec<Arc<Entity>>,
    poll_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    logger: StructuredLogger,
}

impl AccountContext {
    /// Connect, fetch the first snapshot and create the entities.
    ///
    /// Rejected credentials fail with [`ChargeSyncError::Auth`], anything
    /// else that keeps the first snapshot from loading with
    /// [`ChargeSyncError::NotReady`]. The poll loop is not started here.
    pub async fn setup(
        mut entry: ConfigEntry,
        connector: &dyn ClientConnector,
        store: Arc<dyn EntryStore>,
        config_dir: &Path,
    ) -> Result<Self> {
        let logger = get_logger_with_context(
            LogContext::new("setup").with_entry_id(entry.entry_id.clone()),
        );
        logger.info(&format!(
            "Setting up ChargePoint account {}",
            entry.data.username
        ));

        match migrate_legacy_token(config_dir, &mut entry) {
            Ok(true) => store.update_session_token(&entry.entry_id, &entry.data.session_token)?,
            Ok(false) => {}
            Err(e) => logger.warn(&format!("Legacy token cleanup failed: {}", e)),
        }

        let stored_token = entry.data.session_token.clone();
        let client = connector
            .connect(
                &entry.data.username,
                &entry.data.password,
                (!stored_token.is_empty()).then_some(stored_token.as_str()),
            )
            .await
            .map_err(|e| classify_connect_error(&logger, e))?;

        if let Some(token) = client.session_token() {
            if !token.is_empty() && token != stored_token {
                logger.debug("Session token refreshed by client, updating config entry");
                store.update_session_token(&entry.entry_id, &token)?;
                entry.data.session_token = token;
            }
        }

        let coordinator = Arc::new(UpdateCoordinator::new(&entry, client, store));
        coordinator.refresh().await.map_err(|e| match e {
            ChargeSyncError::Auth { .. } => e,
            other => ChargeSyncError::not_ready(other.to_string()),
        })?;
        let snapshot = coordinator
            .latest()
            .ok_or_else(|| ChargeSyncError::not_ready("First refresh published no data"))?;

        let entities = build_entities(&coordinator, &snapshot);
        logger.info(&format!(
            "Account ready with {} charger(s) and {} entities",
            snapshot.chargers.len(),
            entities.len()
        ));

        Ok(Self {
            entry_id: entry.entry_id,
            title: entry.title,
            coordinator,
            entities,
            poll_task: std::sync::Mutex::new(None),
            logger,
        })
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn coordinator(&self) -> &Arc<UpdateCoordinator> {
        &self.coordinator
    }

    pub fn entities(&self) -> &[Arc<Entity>] {
        &self.entities
    }

    /// Entities sharing a unique id live on different platforms
    pub fn entity(&self, unique_id: &str, action: Option<&EntityAction>) -> Option<&Arc<Entity>> {
        let mut matches = self.entities.iter().filter(|e| e.unique_id() == unique_id);
        match action {
            Some(action) => matches.find(|e| e.platform() == action.platform()),
            None => matches.next(),
        }
    }

    /// Spawn the poll loop on the current runtime
    pub fn start(&self) {
        let mut task = self.poll_task.lock().unwrap_or_else(|e| e.into_inner());
        if task.is_some() {
            return;
        }
        let coordinator = Arc::clone(&self.coordinator);
        *task = Some(tokio::spawn(async move { coordinator.run().await }));
    }

    /// Stop polling and wait for the loop to exit
    pub async fn unload(&self) {
        self.coordinator.request_shutdown();
        let task = self
            .poll_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                self.logger.error(&format!("Poll task ended abnormally: {}", e));
            }
        }
        self.logger.info("Account unloaded");
    }
}

impl fmt::Debug for AccountContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountContext")
            .field("entry_id", &self.entry_id)
            .field("title", &self.title)
            .field("entities", &self.entities.len())
            .finish_non_exhaustive()
    }
}

fn classify_connect_error(logger: &StructuredLogger, err: ApiError) -> ChargeSyncError {
    match err {
        ApiError::Login { .. } | ApiError::InvalidSession => {
            logger.error("Failed to authenticate to ChargePoint");
            ChargeSyncError::auth(err.to_string())
        }
        other => {
            logger.error(&format!("Unknown ChargePoint error: {}", other));
            ChargeSyncError::not_ready(other.to_string())
        }
    }
}

/// Try a login without touching any stored entry; returns the new token
pub async fn validate_credentials(
    connector: &dyn ClientConnector,
    username: &str,
    password: &str,
) -> std::result::Result<String, LoginFailure> {
    let logger = get_logger("setup");
    let client = connector
        .connect(username, password, None)
        .await
        .map_err(|e| {
            let failure = LoginFailure::from(&e);
            match &failure {
                LoginFailure::InvalidCredentials => {
                    logger.error("Invalid credentials for ChargePoint")
                }
                LoginFailure::AccountLocked => logger.error("ChargePoint account is locked"),
                LoginFailure::CannotConnect(msg) => {
                    logger.error(&format!("Failed to communicate with ChargePoint: {}", msg))
                }
                LoginFailure::Unknown(msg) => {
                    logger.error(&format!("Unexpected login failure: {}", msg))
                }
            }
            failure
        })?;
    client
        .session_token()
        .ok_or_else(|| LoginFailure::Unknown("Login returned no session token".to_string()))
}

/// Owns the contexts of all loaded accounts
pub struct AccountManager {
    connector: Arc<dyn ClientConnector>,
    store: Arc<dyn EntryStore>,
    config_dir: PathBuf,
    accounts: RwLock<HashMap<String, Arc<AccountContext>>>,
    /// Serializes setup, unload and reload
    lifecycle: Mutex<()>,
    logger: StructuredLogger,
}

impl AccountManager {
    pub fn new<P: AsRef<Path>>(
        connector: Arc<dyn ClientConnector>,
        store: Arc<dyn EntryStore>,
        config_dir: P,
    ) -> Self {
        Self {
            connector,
            store,
            config_dir: config_dir.as_ref().to_path_buf(),
            accounts: RwLock::new(HashMap::new()),
            lifecycle: Mutex::new(()),
            logger: get_logger("accounts"),
        }
    }

    /// Manager that looks for legacy side files in `config.config_dir`
    pub fn from_config(
        connector: Arc<dyn ClientConnector>,
        store: Arc<dyn EntryStore>,
        config: &Config,
    ) -> Self {
        Self::new(connector, store, &config.config_dir)
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Set up one stored entry and start polling it
    pub async fn setup_entry(&self, entry_id: &str) -> Result<Arc<AccountContext>> {
        let _lifecycle = self.lifecycle.lock().await;
        self.setup_locked(entry_id).await
    }

    /// Set up every stored entry; failures are logged and returned per entry
    pub async fn setup_all(&self) -> Vec<(String, Result<()>)> {
        let mut results = Vec::new();
        for entry in self.store.entries() {
            let result = self.setup_entry(&entry.entry_id).await.map(|_| ());
            if let Err(e) = &result {
                self.logger
                    .error(&format!("Setup of entry {} failed: {}", entry.entry_id, e));
            }
            results.push((entry.entry_id, result));
        }
        results
    }

    pub async fn unload_entry(&self, entry_id: &str) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;
        self.unload_locked(entry_id).await
    }

    pub async fn reload_entry(&self, entry_id: &str) -> Result<Arc<AccountContext>> {
        let _lifecycle = self.lifecycle.lock().await;
        self.reload_locked(entry_id).await
    }

    /// Persist new options and reload the account so they take effect
    pub async fn update_options(
        &self,
        entry_id: &str,
        options: EntryOptions,
    ) -> Result<Arc<AccountContext>> {
        if PollInterval::from_seconds(options.poll_interval).is_none() {
            return Err(ChargeSyncError::validation(
                "poll_interval".to_string(),
                format!("{} is not a supported poll interval", options.poll_interval),
            ));
        }
        let _lifecycle = self.lifecycle.lock().await;
        self.store.update_options(entry_id, options)?;
        self.reload_locked(entry_id).await
    }

    /// Store new credentials after they pass a login, then reload
    pub async fn reauthenticate(
        &self,
        entry_id: &str,
        username: &str,
        password: &str,
    ) -> Result<Arc<AccountContext>> {
        let token = validate_credentials(self.connector.as_ref(), username, password)
            .await
            .map_err(|failure| ChargeSyncError::auth(failure.code()))?;
        let _lifecycle = self.lifecycle.lock().await;
        self.store.update_credentials(
            entry_id,
            EntryData {
                username: username.to_string(),
                password: password.to_string(),
                session_token: token,
            },
        )?;
        self.reload_locked(entry_id).await
    }

    // Callers hold `lifecycle`, so the loaded check and the insert cannot
    // interleave with another setup of the same entry.
    async fn setup_locked(&self, entry_id: &str) -> Result<Arc<AccountContext>> {
        if self.accounts.read().await.contains_key(entry_id) {
            return Err(ChargeSyncError::validation(
                "entry_id".to_string(),
                format!("Entry {} is already loaded", entry_id),
            ));
        }
        let entry = self
            .store
            .entry(entry_id)
            .ok_or_else(|| ChargeSyncError::not_found(format!("Config entry {}", entry_id)))?;

        let context = Arc::new(
            AccountContext::setup(
                entry,
                self.connector.as_ref(),
                Arc::clone(&self.store),
                &self.config_dir,
            )
            .await?,
        );
        context.start();
        self.accounts
            .write()
            .await
            .insert(entry_id.to_string(), Arc::clone(&context));
        Ok(context)
    }

    async fn unload_locked(&self, entry_id: &str) -> Result<()> {
        let context = self
            .accounts
            .write()
            .await
            .remove(entry_id)
            .ok_or_else(|| ChargeSyncError::not_found(format!("Loaded account {}", entry_id)))?;
        context.unload().await;
        Ok(())
    }

    async fn reload_locked(&self, entry_id: &str) -> Result<Arc<AccountContext>> {
        if self.accounts.read().await.contains_key(entry_id) {
            self.unload_locked(entry_id).await?;
        }
        self.setup_locked(entry_id).await
    }

    pub async fn account(&self, entry_id: &str) -> Option<Arc<AccountContext>> {
        self.accounts.read().await.get(entry_id).cloned()
    }

    pub async fn accounts(&self) -> Vec<Arc<AccountContext>> {
        let mut accounts: Vec<_> = self.accounts.read().await.values().cloned().collect();
        accounts.sort_by(|a, b| a.entry_id.cmp(&b.entry_id));
        accounts
    }

    pub async fn shutdown(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        let contexts: Vec<_> = self.accounts.write().await.drain().map(|(_, c)| c).collect();
        for context in contexts {
            context.unload().await;
        }
    }
}

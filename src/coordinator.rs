//! Per-account update coordinator
//!
//! Owns the poll schedule of one config entry, runs [`SnapshotBuilder`] one
//! cycle at a time and publishes results on watch channels. An invalid
//! session triggers a single re-login and retry inside the same refresh.

use crate::client::{ApiError, ChargePointApi};
use crate::config::{ConfigEntry, EntryData, PollInterval};
use crate::error::{ChargeSyncError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::persistence::EntryStore;
use crate::snapshot::{BuildError, Snapshot, SnapshotBuilder};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_stream::wrappers::WatchStream;

/// Outcome of the most recent refresh
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateStatus {
    pub last_update_success: bool,
    /// Credentials were rejected; only user action can recover
    pub needs_reauth: bool,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

pub struct UpdateCoordinator {
    entry_id: String,
    credentials: EntryData,
    poll_interval: PollInterval,
    client: Arc<dyn ChargePointApi>,
    store: Arc<dyn EntryStore>,
    refresh_lock: Mutex<()>,
    generation: AtomicU64,
    snapshot_tx: watch::Sender<Option<Arc<Snapshot>>>,
    status_tx: watch::Sender<UpdateStatus>,
    shutdown_tx: mpsc::UnboundedSender<()>,
    shutdown_rx: Mutex<mpsc::UnboundedReceiver<()>>,
    logger: StructuredLogger,
}

impl UpdateCoordinator {
    pub fn new(
        entry: &ConfigEntry,
        client: Arc<dyn ChargePointApi>,
        store: Arc<dyn EntryStore>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        let (status_tx, _) = watch::channel(UpdateStatus::default());
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();

        Self {
            entry_id: entry.entry_id.clone(),
            credentials: entry.data.clone(),
            poll_interval: entry.poll_interval(),
            client,
            store,
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            snapshot_tx,
            status_tx,
            shutdown_tx,
            shutdown_rx: Mutex::new(shutdown_rx),
            logger: get_logger_with_context(
                LogContext::new("coordinator").with_entry_id(entry.entry_id.clone()),
            ),
        }
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn poll_interval(&self) -> PollInterval {
        self.poll_interval
    }

    /// Facade used by entity actions
    pub fn client(&self) -> &Arc<dyn ChargePointApi> {
        &self.client
    }

    /// Latest published snapshot, if any refresh has succeeded yet
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.snapshot_tx.borrow().clone()
    }

    pub fn status(&self) -> UpdateStatus {
        self.status_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.snapshot_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<UpdateStatus> {
        self.status_tx.subscribe()
    }

    /// Snapshot publications as a stream, starting with the current value
    pub fn updates(&self) -> WatchStream<Option<Arc<Snapshot>>> {
        WatchStream::new(self.snapshot_tx.subscribe())
    }

    /// Run one refresh. A call made while another refresh is in flight waits
    /// for it and reports its outcome instead of starting a second cycle.
    pub async fn refresh(&self) -> Result<()> {
        let _guard = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                self.logger
                    .debug("Refresh already in progress, waiting for it");
                let _done = self.refresh_lock.lock().await;
                return self.last_outcome();
            }
        };

        self.status_tx
            .send_modify(|status| status.last_attempt_at = Some(Utc::now()));

        match self.refresh_cycle().await {
            Ok(snapshot) => {
                self.publish(snapshot);
                Ok(())
            }
            Err(err) => Err(self.record_failure(err)),
        }
    }

    /// Out-of-band refresh after an action; failures are only logged
    pub async fn request_refresh(&self) {
        if let Err(e) = self.refresh().await {
            self.logger
                .warn(&format!("Refresh after action failed: {}", e));
        }
    }

    async fn refresh_cycle(&self) -> Result<Snapshot> {
        let previous_session_id = self.latest().and_then(|s| s.session_id());
        let builder = SnapshotBuilder::new(self.client.as_ref()).with_logger(self.logger.clone());
        let mut is_retry = false;

        loop {
            match builder.build(previous_session_id).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(BuildError::InvalidSession) if !is_retry => {
                    self.logger
                        .warn("Session token rejected, logging in again");
                    self.relogin().await?;
                    is_retry = true;
                }
                Err(BuildError::InvalidSession) => {
                    return Err(ChargeSyncError::auth(
                        "Session token rejected again after re-login",
                    ));
                }
                Err(BuildError::Communication(message)) => {
                    return Err(ChargeSyncError::update_failed(message));
                }
            }
        }
    }

    async fn relogin(&self) -> Result<()> {
        let token = self
            .client
            .login(&self.credentials.username, &self.credentials.password)
            .await
            .map_err(|e| match e {
                ApiError::Login { .. } | ApiError::InvalidSession => {
                    ChargeSyncError::auth(format!("Re-login failed: {}", e))
                }
                other => ChargeSyncError::update_failed(format!("Re-login failed: {}", other)),
            })?;

        if let Err(e) = self.store.update_session_token(&self.entry_id, &token) {
            self.logger
                .error(&format!("Failed to persist refreshed session token: {}", e));
        }
        self.logger.info("Re-login succeeded");
        Ok(())
    }

    fn publish(&self, mut snapshot: Snapshot) {
        snapshot.generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.logger.debug(&format!(
            "Publishing snapshot {} with {} charger(s)",
            snapshot.generation,
            snapshot.chargers.len()
        ));
        let fetched_at = snapshot.fetched_at;
        self.snapshot_tx.send_replace(Some(Arc::new(snapshot)));
        self.status_tx.send_modify(|status| {
            status.last_update_success = true;
            status.needs_reauth = false;
            status.last_error = None;
            status.last_success_at = Some(fetched_at);
            status.consecutive_failures = 0;
        });
    }

    fn record_failure(&self, err: ChargeSyncError) -> ChargeSyncError {
        if err.requires_reauth() {
            self.logger
                .error(&format!("Authentication required: {}", err));
        } else {
            self.logger.warn(&format!("{}", err));
        }
        self.status_tx.send_modify(|status| {
            status.last_update_success = false;
            status.needs_reauth = err.requires_reauth();
            status.last_error = Some(err.to_string());
            status.consecutive_failures = status.consecutive_failures.saturating_add(1);
        });
        err
    }

    fn last_outcome(&self) -> Result<()> {
        let status = self.status_tx.borrow();
        if status.last_update_success {
            return Ok(());
        }
        let message = status
            .last_error
            .clone()
            .unwrap_or_else(|| "No refresh has completed".to_string());
        if status.needs_reauth {
            Err(ChargeSyncError::auth(message))
        } else {
            Err(ChargeSyncError::update_failed(message))
        }
    }

    /// Poll until [`request_shutdown`](Self::request_shutdown) is called.
    /// The first tick fires one interval from now; setup has already fetched
    /// the first snapshot.
    pub async fn run(&self) {
        let period = self.poll_interval.as_duration();
        let mut poll = interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown_rx = self.shutdown_rx.lock().await;

        self.logger.info(&format!(
            "Polling every {}",
            self.poll_interval.label()
        ));

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    // Failures are recorded in the status channel
                    let _ = self.refresh().await;
                }
                _ = shutdown_rx.recv() => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
            }
        }
    }

    pub fn request_shutdown(&self) {
        self.shutdown_tx.send(()).ok();
    }
}

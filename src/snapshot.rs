//! Account snapshots and the poll cycle that builds them
//!
//! A [`Snapshot`] is produced by one successful run of [`SnapshotBuilder`]
//! and never changes afterwards. Consumers hold it behind an `Arc` and read it
//! through the accessors below.

use crate::client::{
    Account, ApiError, ChargePointApi, ChargerId, ChargingSession, HomeChargerStatus,
    HomeChargerTechnicalInfo, SessionId, UserChargingStatus,
};
use crate::logging::{StructuredLogger, get_logger};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Status and technical info of one home charger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargerData {
    pub status: HomeChargerStatus,
    pub technical_info: HomeChargerTechnicalInfo,
}

/// Fully populated account state from one poll cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub account: Account,
    pub charging_status: Option<UserChargingStatus>,
    /// Active session, on whichever charger it runs
    pub session: Option<ChargingSession>,
    pub chargers: BTreeMap<ChargerId, ChargerData>,
    pub fetched_at: DateTime<Utc>,
    pub poll_duration_ms: u64,
    /// Publication counter, assigned by the coordinator (0 = unpublished)
    pub generation: u64,
}

impl Snapshot {
    pub fn charger(&self, charger_id: ChargerId) -> Option<&ChargerData> {
        self.chargers.get(&charger_id)
    }

    pub fn charger_status(&self, charger_id: ChargerId) -> Option<&HomeChargerStatus> {
        self.charger(charger_id).map(|c| &c.status)
    }

    pub fn technical_info(&self, charger_id: ChargerId) -> Option<&HomeChargerTechnicalInfo> {
        self.charger(charger_id).map(|c| &c.technical_info)
    }

    pub fn charger_ids(&self) -> impl Iterator<Item = ChargerId> + '_ {
        self.chargers.keys().copied()
    }

    /// The active session, only if it runs on `charger_id`
    pub fn session_for(&self, charger_id: ChargerId) -> Option<&ChargingSession> {
        self.session
            .as_ref()
            .filter(|session| session.device_id == charger_id)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.session_id)
    }
}

/// Why a poll cycle produced no snapshot
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    /// The service rejected the session token
    #[error("Session token rejected by ChargePoint")]
    InvalidSession,

    #[error("Failed to update ChargePoint state: {0}")]
    Communication(String),
}

impl From<ApiError> for BuildError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::InvalidSession => BuildError::InvalidSession,
            other => BuildError::Communication(other.to_string()),
        }
    }
}

/// Runs one poll cycle against the facade
pub struct SnapshotBuilder<'a> {
    client: &'a dyn ChargePointApi,
    logger: StructuredLogger,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(client: &'a dyn ChargePointApi) -> Self {
        Self {
            client,
            logger: get_logger("snapshot"),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Fetch everything in dependency order. Any failed call aborts the cycle;
    /// a partially fetched snapshot is never returned.
    pub async fn build(
        &self,
        previous_session_id: Option<SessionId>,
    ) -> Result<Snapshot, BuildError> {
        let started = std::time::Instant::now();

        let account = self.client.get_account().await?;
        self.logger
            .debug(&format!("Account information: {:?}", account.user.username));

        let charging_status = self.client.get_user_charging_status().await?;
        self.logger
            .debug(&format!("User charging status: {:?}", charging_status));

        let session = match &charging_status {
            Some(status) => {
                let session = self
                    .client
                    .get_charging_session(status.session_id)
                    .await?;
                self.logger.debug(&format!(
                    "Charging session {} on charger {}: {}",
                    session.session_id, session.device_id, session.charging_state
                ));
                Some(session)
            }
            None => None,
        };
        self.log_session_transition(previous_session_id, session.as_ref());

        let mut chargers = BTreeMap::new();
        for charger_id in self.client.get_home_chargers().await? {
            let status = self.client.get_home_charger_status(charger_id).await?;
            let technical_info = self
                .client
                .get_home_charger_technical_info(charger_id)
                .await?;
            chargers.insert(
                charger_id,
                ChargerData {
                    status,
                    technical_info,
                },
            );
        }

        Ok(Snapshot {
            account,
            charging_status,
            session,
            chargers,
            fetched_at: Utc::now(),
            poll_duration_ms: started.elapsed().as_millis() as u64,
            generation: 0,
        })
    }

    fn log_session_transition(
        &self,
        previous: Option<SessionId>,
        current: Option<&ChargingSession>,
    ) {
        match (previous, current.map(|s| s.session_id)) {
            (None, Some(id)) => self.logger.info(&format!("Charging session {} started", id)),
            (Some(id), None) => self.logger.info(&format!("Charging session {} ended", id)),
            (Some(prev), Some(cur)) if prev != cur => self.logger.info(&format!(
                "Charging session {} replaced by {}",
                prev, cur
            )),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AccountBalance, User};

    fn session_on(charger: u64) -> ChargingSession {
        ChargingSession {
            session_id: SessionId(7),
            device_id: ChargerId(charger),
            device_name: "Garage".to_string(),
            charging_state: "IN_USE".to_string(),
            charging_time: 60_000,
            power_kw: 7.2,
            energy_kwh: 1.5,
            miles_added: 5.0,
            miles_added_per_hour: 25.0,
            total_amount: 0.42,
        }
    }

    fn snapshot_with(session: Option<ChargingSession>) -> Snapshot {
        Snapshot {
            account: Account {
                user: User {
                    user_id: 1,
                    username: "driver".to_string(),
                    full_name: "Driver".to_string(),
                    email: "driver@example.com".to_string(),
                },
                account_balance: AccountBalance {
                    amount: 10.0,
                    currency: "USD".to_string(),
                },
            },
            charging_status: None,
            session,
            chargers: BTreeMap::new(),
            fetched_at: Utc::now(),
            poll_duration_ms: 0,
            generation: 1,
        }
    }

    #[test]
    fn session_is_only_attached_to_its_own_charger() {
        let snap = snapshot_with(Some(session_on(42)));
        assert!(snap.session_for(ChargerId(42)).is_some());
        assert!(snap.session_for(ChargerId(43)).is_none());
        assert_eq!(snap.session_id(), Some(SessionId(7)));
    }

    #[test]
    fn no_session_means_nothing_attached() {
        let snap = snapshot_with(None);
        assert!(snap.session_for(ChargerId(42)).is_none());
        assert_eq!(snap.charger_ids().count(), 0);
    }

    #[test]
    fn api_errors_are_classified() {
        assert_eq!(
            BuildError::from(ApiError::InvalidSession),
            BuildError::InvalidSession
        );
        assert!(matches!(
            BuildError::from(ApiError::login(Some(9), "nope")),
            BuildError::Communication(_)
        ));
        assert!(matches!(
            BuildError::from(ApiError::provider("500")),
            BuildError::Communication(_)
        ));
    }
}

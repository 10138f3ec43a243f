//! Charging session switch

use super::description::{DeviceClass, EntityDescription, Platform};
use super::{ActionContext, LocalHold, lock};
use crate::client::{ApiError, ChargerId, ChargingSession, SessionId};
use crate::error::{ChargeSyncError, Result};
use crate::snapshot::Snapshot;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

pub static CHARGING_SESSION: EntityDescription = EntityDescription::new(
    Platform::Switch,
    "charging_session",
    "Charging Session",
    "mdi:lightning-bolt",
)
.device_class(DeviceClass::Switch);

/// How long a locally started session reads as "on" without confirmation
pub const START_GRACE_SECONDS: i64 = 180;

pub(crate) const SOFT_FAILURE_MSG: &str = "ChargePoint returned an error, the action may still \
     have gone through. Check the app if in doubt.";

/// Starts and stops charging on one charger.
///
/// The session API is eventually consistent, so a start is reported as on
/// for [`START_GRACE_SECONDS`] and a stop hides the session until the next
/// snapshot is published.
#[derive(Debug, Default)]
pub struct ChargingSessionSwitch {
    last_toggled_on: Mutex<Option<DateTime<Utc>>>,
    stopped: Mutex<Option<LocalHold<SessionId>>>,
}

impl ChargingSessionSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_toggled_on(&self) -> Option<DateTime<Utc>> {
        *lock(&self.last_toggled_on)
    }

    /// Session this switch controls, minus one it stopped locally
    pub fn session<'a>(
        &self,
        snapshot: &'a Snapshot,
        charger_id: ChargerId,
    ) -> Option<&'a ChargingSession> {
        let session = snapshot.session_for(charger_id)?;
        let stopped = (*lock(&self.stopped)).and_then(|hold| hold.current(snapshot));
        match stopped {
            Some(id) if id == session.session_id => None,
            _ => Some(session),
        }
    }

    pub fn is_on_at(&self, snapshot: &Snapshot, charger_id: ChargerId, now: DateTime<Utc>) -> bool {
        if let Some(started) = self.last_toggled_on() {
            if started + Duration::seconds(START_GRACE_SECONDS) > now {
                return true;
            }
        }
        self.session(snapshot, charger_id)
            .is_some_and(ChargingSession::is_in_use)
    }

    pub(crate) async fn turn_on(&self, ctx: &ActionContext<'_>) -> Result<()> {
        let snapshot = ctx.snapshot()?;
        if !ctx.charger_status(&snapshot)?.plugged_in {
            return Err(ChargeSyncError::validation(
                "plugged_in",
                "Cannot start session if charger not plugged in",
            ));
        }

        ctx.logger.info(&format!(
            "Starting new ChargePoint session on charger {}",
            ctx.charger_id
        ));
        match ctx.client().start_charging_session(ctx.charger_id).await {
            Ok(session) => ctx
                .logger
                .debug(&format!("Start acknowledged with session {}", session.session_id)),
            Err(ApiError::Communication { message }) => {
                ctx.logger
                    .warn(&format!("{} ({})", SOFT_FAILURE_MSG, message));
            }
            Err(e) => return Err(ChargeSyncError::api(format!("Cannot start session: {}", e))),
        }

        *lock(&self.last_toggled_on) = Some(Utc::now());
        *lock(&self.stopped) = None;
        ctx.refresh().await;
        Ok(())
    }

    pub(crate) async fn turn_off(&self, ctx: &ActionContext<'_>) -> Result<()> {
        let snapshot = ctx.snapshot()?;
        let session = self.session(&snapshot, ctx.charger_id).ok_or_else(|| {
            ChargeSyncError::validation("session", "Cannot stop a session that doesn't exist")
        })?;
        if !session.is_in_use() {
            return Err(ChargeSyncError::validation(
                "session",
                "Cannot stop a session that hasn't started",
            ));
        }
        let session_id = session.session_id;

        ctx.logger
            .info(&format!("Stopping ChargePoint session {}", session_id));
        match ctx.client().stop_charging_session(session_id).await {
            Ok(()) => {}
            Err(ApiError::Communication { message }) => {
                ctx.logger
                    .warn(&format!("{} ({})", SOFT_FAILURE_MSG, message));
            }
            Err(e) => return Err(ChargeSyncError::api(format!("Cannot stop session: {}", e))),
        }

        *lock(&self.stopped) = Some(LocalHold {
            value: session_id,
            generation: snapshot.generation,
        });
        *lock(&self.last_toggled_on) = None;
        ctx.refresh().await;
        Ok(())
    }
}

//! Restart button

use super::description::{DeviceClass, EntityDescription, Platform};
use super::switch::SOFT_FAILURE_MSG;
use super::{ActionContext, lock};
use crate::client::ApiError;
use crate::error::{ChargeSyncError, Result};
use chrono::{DateTime, Utc};
use std::sync::Mutex;

pub static RESTART_CHARGER: EntityDescription = EntityDescription::new(
    Platform::Button,
    "restart_charger",
    "Restart Charger",
    "mdi:restart",
)
.device_class(DeviceClass::Restart);

#[derive(Debug, Default)]
pub struct RestartButton {
    last_pressed: Mutex<Option<DateTime<Utc>>>,
}

impl RestartButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_pressed(&self) -> Option<DateTime<Utc>> {
        *lock(&self.last_pressed)
    }

    /// Restart acknowledgements are unreliable; transport errors are logged only
    pub(crate) async fn press(&self, ctx: &ActionContext<'_>) -> Result<()> {
        ctx.logger
            .info(&format!("Restarting charger {}", ctx.charger_id));
        match ctx.client().restart_home_charger(ctx.charger_id).await {
            Ok(()) => {}
            Err(ApiError::Communication { message }) => {
                ctx.logger
                    .warn(&format!("{} ({})", SOFT_FAILURE_MSG, message));
            }
            Err(e) => return Err(ChargeSyncError::api(format!("Cannot restart charger: {}", e))),
        }

        *lock(&self.last_pressed) = Some(Utc::now());
        ctx.refresh().await;
        Ok(())
    }
}

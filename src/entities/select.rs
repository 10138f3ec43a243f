//! Amperage limit as a select entity

use super::description::{EntityDescription, Platform};
use super::number::AmperageLimit;
use super::{ActionContext, EntityState, EntityValue};
use crate::client::HomeChargerStatus;
use crate::error::{ChargeSyncError, Result};
use crate::snapshot::Snapshot;
use std::sync::Arc;

pub static AMPERAGE_SELECT: EntityDescription = EntityDescription::new(
    Platform::Select,
    "charging_amperage_limit",
    "Charging Amperage Limit",
    "mdi:lightning-bolt",
)
.unit("A");

/// Shares its [`AmperageLimit`] with the charger's number entity
#[derive(Debug)]
pub struct AmperageSelect {
    limit: Arc<AmperageLimit>,
}

impl AmperageSelect {
    pub fn new(limit: Arc<AmperageLimit>) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> &Arc<AmperageLimit> {
        &self.limit
    }

    pub(crate) fn render(
        &self,
        snapshot: &Snapshot,
        status: &HomeChargerStatus,
        state: &mut EntityState,
    ) {
        state.options = status
            .possible_amperage_limits
            .iter()
            .map(u32::to_string)
            .collect();
        state.value = Some(EntityValue::Text(
            self.limit.current(snapshot, status).to_string(),
        ));
    }

    pub(crate) async fn select_option(&self, ctx: &ActionContext<'_>, option: &str) -> Result<()> {
        let amps = option.trim().parse::<u32>().map_err(|_| {
            ChargeSyncError::validation(
                "option".to_string(),
                format!("{:?} is not an amperage", option),
            )
        })?;
        self.limit.set(ctx, amps).await
    }
}

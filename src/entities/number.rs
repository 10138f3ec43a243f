//! Amperage limit as a numeric entity, plus the limit logic shared with the
//! select entity

use super::description::{DeviceClass, EntityDescription, Platform};
use super::{ActionContext, EntityState, EntityValue, LocalHold, lock};
use crate::client::HomeChargerStatus;
use crate::error::{ChargeSyncError, Result};
use crate::snapshot::Snapshot;
use std::sync::{Arc, Mutex};

pub static AMPERAGE_NUMBER: EntityDescription = EntityDescription::new(
    Platform::Number,
    "charging_amperage_limit",
    "Charging Amperage Limit",
    "mdi:lightning-bolt",
)
.device_class(DeviceClass::Current)
.unit("A");

/// Charger amperage limit with a local hold after a successful write.
///
/// One instance exists per charger and is shared by its select and number
/// entities, so a write through either shows up in both.
#[derive(Debug, Default)]
pub struct AmperageLimit {
    hold: Mutex<Option<LocalHold<u32>>>,
}

impl AmperageLimit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locally held value while `snapshot` is the one it was set against,
    /// otherwise the charger's reported limit
    pub fn current(&self, snapshot: &Snapshot, status: &HomeChargerStatus) -> u32 {
        (*lock(&self.hold))
            .and_then(|hold| hold.current(snapshot))
            .unwrap_or(status.amperage_limit)
    }

    pub(crate) async fn set(&self, ctx: &ActionContext<'_>, amps: u32) -> Result<()> {
        let snapshot = ctx.snapshot()?;
        validate_amperage(ctx.charger_status(&snapshot)?, amps)?;

        ctx.logger.warn(&format!(
            "Setting new ChargePoint amperage on charger {} to {}",
            ctx.charger_id, amps
        ));
        ctx.client()
            .set_amperage_limit(ctx.charger_id, amps)
            .await
            .map_err(|e| {
                ctx.logger
                    .error(&format!("Cannot set new amperage limit: {}", e));
                ChargeSyncError::api(format!("Cannot set new amperage limit: {}", e))
            })?;

        *lock(&self.hold) = Some(LocalHold {
            value: amps,
            generation: snapshot.generation,
        });
        ctx.refresh().await;
        Ok(())
    }
}

/// Reject writes the charger would refuse
pub fn validate_amperage(status: &HomeChargerStatus, amps: u32) -> Result<()> {
    if !status.plugged_in {
        return Err(ChargeSyncError::validation(
            "plugged_in",
            "Cannot set amperage if charger not plugged in",
        ));
    }
    if !status.permits_amperage(amps) {
        return Err(ChargeSyncError::validation(
            "amperage_limit".to_string(),
            format!(
                "{} A is not one of the permitted limits {:?}",
                amps, status.possible_amperage_limits
            ),
        ));
    }
    Ok(())
}

#[derive(Debug)]
pub struct AmperageNumber {
    limit: Arc<AmperageLimit>,
}

impl AmperageNumber {
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
        state.value = Some(EntityValue::Float(
            self.limit.current(snapshot, status) as f64,
        ));
        state.min = status.possible_amperage_limits.iter().min().map(|v| *v as f64);
        state.max = status.possible_amperage_limits.iter().max().map(|v| *v as f64);
        state.step = Some(1.0);
    }

    pub(crate) async fn set_value(&self, ctx: &ActionContext<'_>, value: f64) -> Result<()> {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
            return Err(ChargeSyncError::validation(
                "value".to_string(),
                format!("{} is not a whole number of amps", value),
            ));
        }
        self.limit.set(ctx, value as u32).await
    }
}

//! Capability table mapping each entity kind to its metadata and constructor

use super::button::{RESTART_CHARGER, RestartButton};
use super::description::EntityDescription;
use super::device::DeviceInfo;
use super::number::{AMPERAGE_NUMBER, AmperageLimit, AmperageNumber};
use super::select::{AMPERAGE_SELECT, AmperageSelect};
use super::sensor::{ACCOUNT_SENSORS, AccountSensor, CHARGER_SENSORS, ChargerSensor};
use super::switch::{CHARGING_SESSION, ChargingSessionSwitch};
use super::{Entity, EntityKind};
use crate::coordinator::UpdateCoordinator;
use crate::snapshot::Snapshot;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Whether an entity exists once per account or once per home charger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Account,
    Charger,
}

#[derive(Clone, Copy)]
pub enum Capability {
    AccountSensor(&'static AccountSensor),
    ChargerSensor(&'static ChargerSensor),
    ChargingSession,
    AmperageSelect,
    AmperageNumber,
    RestartCharger,
}

impl Capability {
    pub fn description(&self) -> &'static EntityDescription {
        match self {
            Capability::AccountSensor(sensor) => &sensor.description,
            Capability::ChargerSensor(sensor) => &sensor.description,
            Capability::ChargingSession => &CHARGING_SESSION,
            Capability::AmperageSelect => &AMPERAGE_SELECT,
            Capability::AmperageNumber => &AMPERAGE_NUMBER,
            Capability::RestartCharger => &RESTART_CHARGER,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Capability::AccountSensor(_) => Scope::Account,
            _ => Scope::Charger,
        }
    }

    /// `limit` is the charger's shared amperage limit
    fn construct(&self, limit: &Arc<AmperageLimit>) -> EntityKind {
        match *self {
            Capability::AccountSensor(sensor) => EntityKind::AccountSensor(sensor),
            Capability::ChargerSensor(sensor) => EntityKind::ChargerSensor(sensor),
            Capability::ChargingSession => {
                EntityKind::ChargingSession(ChargingSessionSwitch::new())
            }
            Capability::AmperageSelect => {
                EntityKind::AmperageSelect(AmperageSelect::new(Arc::clone(limit)))
            }
            Capability::AmperageNumber => {
                EntityKind::AmperageNumber(AmperageNumber::new(Arc::clone(limit)))
            }
            Capability::RestartCharger => EntityKind::RestartCharger(RestartButton::new()),
        }
    }
}

/// Every capability, in the order entities are created
pub static REGISTRY: Lazy<Vec<Capability>> = Lazy::new(|| {
    ACCOUNT_SENSORS
        .iter()
        .map(Capability::AccountSensor)
        .chain(CHARGER_SENSORS.iter().map(Capability::ChargerSensor))
        .chain([
            Capability::ChargingSession,
            Capability::AmperageSelect,
            Capability::AmperageNumber,
            Capability::RestartCharger,
        ])
        .collect()
});

/// Create the account's entities from its first snapshot.
///
/// Chargers that show up in later snapshots get no entities until the
/// account is reloaded.
pub fn build_entities(
    coordinator: &Arc<UpdateCoordinator>,
    snapshot: &Snapshot,
) -> Vec<Arc<Entity>> {
    let user = &snapshot.account.user;
    let devices: Vec<_> = snapshot
        .chargers
        .iter()
        .map(|(charger_id, data)| {
            let device = DeviceInfo::new(*charger_id, &data.status, &data.technical_info);
            (*charger_id, device, Arc::new(AmperageLimit::new()))
        })
        .collect();
    // Account entities never read it
    let unused_limit = Arc::new(AmperageLimit::new());

    let mut entities = Vec::new();
    for capability in REGISTRY.iter() {
        let description = capability.description();
        match capability.scope() {
            Scope::Account => entities.push(Arc::new(Entity::new(
                format!("{}_{}", user.user_id, description.key),
                format!("{} {}", user.username, description.name_suffix),
                description,
                None,
                None,
                capability.construct(&unused_limit),
                Arc::clone(coordinator),
            ))),
            Scope::Charger => {
                for (charger_id, device, limit) in &devices {
                    entities.push(Arc::new(Entity::new(
                        format!("{}_{}", charger_id, description.key),
                        format!("{} {}", device.short_model, description.name_suffix),
                        description,
                        Some(*charger_id),
                        Some(device.clone()),
                        capability.construct(limit),
                        Arc::clone(coordinator),
                    )));
                }
            }
        }
    }
    entities
}

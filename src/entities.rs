//! Entity views over published snapshots
//!
//! Every entity pairs a static [`EntityDescription`] with a behaviour
//! ([`EntityKind`]). Rendering reads an immutable [`Snapshot`] passed in by
//! reference. Actions call the facade through the account's coordinator and
//! then ask it for an early refresh. Entities are created once from the first
//! snapshot via the capability table in [`registry`].

use crate::client::{
    Account, ChargePointApi, ChargerId, ChargingSession, HomeChargerStatus,
    HomeChargerTechnicalInfo,
};
use crate::coordinator::{UpdateCoordinator, UpdateStatus};
use crate::error::{ChargeSyncError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub mod button;
pub mod description;
pub mod device;
pub mod number;
pub mod registry;
pub mod select;
pub mod sensor;
pub mod switch;

pub use button::RestartButton;
pub use description::{DeviceClass, EntityDescription, Platform, StateClass};
pub use device::DeviceInfo;
pub use number::{AmperageLimit, AmperageNumber};
pub use registry::{Capability, Scope, build_entities};
pub use select::AmperageSelect;
pub use sensor::{ACCOUNT_SENSORS, AccountSensor, CHARGER_SENSORS, ChargerSensor};
pub use switch::ChargingSessionSwitch;

/// Rendered value of an entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

/// Everything a host needs to display one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub unique_id: String,
    pub name: String,
    pub platform: Platform,
    pub icon: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<DeviceClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<StateClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charger_id: Option<ChargerId>,
    pub value: Option<EntityValue>,
    pub unit: Option<String>,
    pub available: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

/// User-triggered operation on an entity
#[derive(Debug, Clone, PartialEq)]
pub enum EntityAction {
    TurnOn,
    TurnOff,
    Press,
    SelectOption(String),
    SetValue(f64),
}

impl EntityAction {
    pub fn name(&self) -> &'static str {
        match self {
            EntityAction::TurnOn => "turn_on",
            EntityAction::TurnOff => "turn_off",
            EntityAction::Press => "press",
            EntityAction::SelectOption(_) => "select",
            EntityAction::SetValue(_) => "set_value",
        }
    }

    /// Platform whose entities handle this action
    pub fn platform(&self) -> Platform {
        match self {
            EntityAction::TurnOn | EntityAction::TurnOff => Platform::Switch,
            EntityAction::Press => Platform::Button,
            EntityAction::SelectOption(_) => Platform::Select,
            EntityAction::SetValue(_) => Platform::Number,
        }
    }
}

impl fmt::Display for EntityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One charger's slice of a snapshot
#[derive(Debug, Clone, Copy)]
pub struct ChargerView<'a> {
    pub charger_id: ChargerId,
    pub account: &'a Account,
    pub status: &'a HomeChargerStatus,
    pub technical_info: &'a HomeChargerTechnicalInfo,
    /// Active session, only when it runs on this charger
    pub session: Option<&'a ChargingSession>,
}

impl<'a> ChargerView<'a> {
    pub fn new(snapshot: &'a Snapshot, charger_id: ChargerId) -> Option<Self> {
        let charger = snapshot.charger(charger_id)?;
        Some(Self {
            charger_id,
            account: &snapshot.account,
            status: &charger.status,
            technical_info: &charger.technical_info,
            session: snapshot.session_for(charger_id),
        })
    }
}

/// Value held locally after an action, valid while `generation` is still
/// the latest published snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LocalHold<T> {
    pub value: T,
    pub generation: u64,
}

impl<T: Copy> LocalHold<T> {
    pub fn current(&self, snapshot: &Snapshot) -> Option<T> {
        (snapshot.generation == self.generation).then_some(self.value)
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What an action handler gets to work with
pub(crate) struct ActionContext<'a> {
    pub coordinator: &'a UpdateCoordinator,
    pub charger_id: ChargerId,
    pub logger: &'a StructuredLogger,
}

impl ActionContext<'_> {
    pub fn client(&self) -> &dyn ChargePointApi {
        self.coordinator.client().as_ref()
    }

    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.coordinator
            .latest()
            .ok_or_else(|| ChargeSyncError::not_ready("No ChargePoint data available yet"))
    }

    pub fn charger_status<'s>(&self, snapshot: &'s Snapshot) -> Result<&'s HomeChargerStatus> {
        snapshot
            .charger_status(self.charger_id)
            .ok_or_else(|| {
                ChargeSyncError::not_found(format!(
                    "Charger {} is not in the latest data",
                    self.charger_id
                ))
            })
    }

    pub async fn refresh(&self) {
        self.coordinator.request_refresh().await;
    }
}

/// Behaviour behind an entity
pub enum EntityKind {
    AccountSensor(&'static AccountSensor),
    ChargerSensor(&'static ChargerSensor),
    ChargingSession(ChargingSessionSwitch),
    AmperageSelect(AmperageSelect),
    AmperageNumber(AmperageNumber),
    RestartCharger(RestartButton),
}

pub struct Entity {
    unique_id: String,
    name: String,
    description: &'static EntityDescription,
    charger_id: Option<ChargerId>,
    device: Option<DeviceInfo>,
    kind: EntityKind,
    coordinator: Arc<UpdateCoordinator>,
    logger: StructuredLogger,
}

impl Entity {
    pub(crate) fn new(
        unique_id: String,
        name: String,
        description: &'static EntityDescription,
        charger_id: Option<ChargerId>,
        device: Option<DeviceInfo>,
        kind: EntityKind,
        coordinator: Arc<UpdateCoordinator>,
    ) -> Self {
        let mut context = LogContext::new(description.key)
            .with_entry_id(coordinator.entry_id().to_string());
        if let Some(charger_id) = charger_id {
            context = context.with_charger_id(charger_id.0);
        }
        Self {
            unique_id,
            name,
            description,
            charger_id,
            device,
            kind,
            coordinator,
            logger: get_logger_with_context(context),
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &'static EntityDescription {
        self.description
    }

    pub fn platform(&self) -> Platform {
        self.description.platform
    }

    pub fn charger_id(&self) -> Option<ChargerId> {
        self.charger_id
    }

    pub fn device(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Render against the coordinator's latest snapshot and status
    pub fn state(&self) -> EntityState {
        let snapshot = self.coordinator.latest();
        self.state_at(snapshot.as_deref(), &self.coordinator.status(), Utc::now())
    }

    pub fn state_at(
        &self,
        snapshot: Option<&Snapshot>,
        status: &UpdateStatus,
        now: DateTime<Utc>,
    ) -> EntityState {
        let mut state = EntityState {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            platform: self.description.platform,
            icon: self.description.icon,
            device_class: self.description.device_class,
            state_class: self.description.state_class,
            charger_id: self.charger_id,
            value: None,
            unit: self.description.unit.map(str::to_string),
            available: false,
            options: Vec::new(),
            min: None,
            max: None,
            step: None,
        };

        let Some(snapshot) = snapshot else {
            return state;
        };

        if let EntityKind::AccountSensor(sensor) = &self.kind {
            sensor.render(&snapshot.account, &mut state);
            state.available = status.last_update_success;
            return state;
        }

        let Some(view) = self
            .charger_id
            .and_then(|charger_id| ChargerView::new(snapshot, charger_id))
        else {
            return state;
        };

        match &self.kind {
            EntityKind::AccountSensor(_) => {}
            EntityKind::ChargerSensor(sensor) => sensor.render(&view, &mut state),
            EntityKind::ChargingSession(switch) => {
                let on = switch.is_on_at(snapshot, view.charger_id, now);
                state.value = Some(EntityValue::Bool(on));
            }
            EntityKind::AmperageSelect(select) => select.render(snapshot, view.status, &mut state),
            EntityKind::AmperageNumber(number) => number.render(snapshot, view.status, &mut state),
            EntityKind::RestartCharger(button) => {
                state.value = button.last_pressed().map(EntityValue::Timestamp);
            }
        }
        state.available = status.last_update_success;
        state
    }

    /// Run a user action. Validation failures never reach the network.
    pub async fn perform(&self, action: EntityAction) -> Result<()> {
        let Some(charger_id) = self.charger_id else {
            return Err(self.unsupported(&action));
        };
        let ctx = ActionContext {
            coordinator: &self.coordinator,
            charger_id,
            logger: &self.logger,
        };

        match (&self.kind, action) {
            (EntityKind::ChargingSession(switch), EntityAction::TurnOn) => {
                switch.turn_on(&ctx).await
            }
            (EntityKind::ChargingSession(switch), EntityAction::TurnOff) => {
                switch.turn_off(&ctx).await
            }
            (EntityKind::AmperageSelect(select), EntityAction::SelectOption(option)) => {
                select.select_option(&ctx, &option).await
            }
            (EntityKind::AmperageNumber(number), EntityAction::SetValue(value)) => {
                number.set_value(&ctx, value).await
            }
            (EntityKind::RestartCharger(button), EntityAction::Press) => button.press(&ctx).await,
            (_, action) => Err(self.unsupported(&action)),
        }
    }

    fn unsupported(&self, action: &EntityAction) -> ChargeSyncError {
        ChargeSyncError::validation(
            "action".to_string(),
            format!("{} does not support {}", self.unique_id, action),
        )
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("unique_id", &self.unique_id)
            .field("name", &self.name)
            .field("platform", &self.description.platform)
            .finish()
    }
}

/// "SOME_STATE" -> "Some State"
pub(crate) fn title_case(raw: &str) -> String {
    raw.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

//! Display metadata shared by every entity kind

use serde::Serialize;

/// Host platform an entity is exposed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Sensor,
    Switch,
    Select,
    Number,
    Button,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Monetary,
    Timestamp,
    Power,
    Energy,
    Current,
    Switch,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    Total,
    TotalIncreasing,
}

/// Static description of one entity kind.
///
/// `key` becomes the unique id suffix and `name_suffix` the display name
/// suffix, prefixed by the charger model or the account username.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityDescription {
    pub key: &'static str,
    pub name_suffix: &'static str,
    pub icon: &'static str,
    pub platform: Platform,
    pub device_class: Option<DeviceClass>,
    pub state_class: Option<StateClass>,
    pub unit: Option<&'static str>,
}

impl EntityDescription {
    pub const fn new(
        platform: Platform,
        key: &'static str,
        name_suffix: &'static str,
        icon: &'static str,
    ) -> Self {
        Self {
            key,
            name_suffix,
            icon,
            platform,
            device_class: None,
            state_class: None,
            unit: None,
        }
    }

    pub const fn device_class(mut self, device_class: DeviceClass) -> Self {
        self.device_class = Some(device_class);
        self
    }

    pub const fn state_class(mut self, state_class: StateClass) -> Self {
        self.state_class = Some(state_class);
        self
    }

    pub const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }
}

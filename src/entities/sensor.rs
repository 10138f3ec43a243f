//! Read-only sensors for the account and each home charger

use super::description::{DeviceClass, EntityDescription, Platform, StateClass};
use super::{ChargerView, EntityState, EntityValue, title_case};
use crate::client::Account;

pub struct AccountSensor {
    pub description: EntityDescription,
    pub value: fn(&Account) -> Option<EntityValue>,
    /// Unit derived from the data, overriding `description.unit`
    pub unit: Option<fn(&Account) -> String>,
}

impl AccountSensor {
    pub(crate) fn render(&self, account: &Account, state: &mut EntityState) {
        state.value = (self.value)(account);
        if let Some(unit) = self.unit {
            state.unit = Some(unit(account));
        }
    }
}

pub struct ChargerSensor {
    pub description: EntityDescription,
    pub value: fn(&ChargerView<'_>) -> Option<EntityValue>,
    pub unit: Option<fn(&ChargerView<'_>) -> String>,
}

impl ChargerSensor {
    pub(crate) fn render(&self, view: &ChargerView<'_>, state: &mut EntityState) {
        state.value = (self.value)(view);
        if let Some(unit) = self.unit {
            state.unit = Some(unit(view));
        }
    }
}

pub static ACCOUNT_SENSORS: [AccountSensor; 1] = [AccountSensor {
    description: EntityDescription::new(
        Platform::Sensor,
        "account_balance",
        "Account Balance",
        "mdi:wallet",
    )
    .device_class(DeviceClass::Monetary)
    .state_class(StateClass::Total),
    value: |account| Some(money(account.account_balance.amount)),
    unit: Some(|account| account.account_balance.currency.clone()),
}];

pub static CHARGER_SENSORS: [ChargerSensor; 12] = [
    ChargerSensor {
        description: EntityDescription::new(
            Platform::Sensor,
            "charging_status",
            "Charging Status",
            "mdi:lightning-bolt",
        ),
        value: |view| Some(EntityValue::Text(title_case(&view.status.charging_status))),
        unit: None,
    },
    ChargerSensor {
        description: EntityDescription::new(
            Platform::Sensor,
            "plugged_in",
            "Charging Cable",
            "mdi:power-plug",
        ),
        value: |view| {
            let text = if view.status.plugged_in { "Plugged In" } else { "Unplugged" };
            Some(EntityValue::Text(text.to_string()))
        },
        unit: None,
    },
    ChargerSensor {
        description: EntityDescription::new(Platform::Sensor, "connected", "Network", "mdi:wifi"),
        value: |view| {
            let text = if view.status.connected { "Connected" } else { "Disconnected" };
            Some(EntityValue::Text(text.to_string()))
        },
        unit: None,
    },
    ChargerSensor {
        description: EntityDescription::new(
            Platform::Sensor,
            "last_connected_at",
            "Last Connected At",
            "mdi:progress-clock",
        )
        .device_class(DeviceClass::Timestamp),
        value: |view| view.status.last_connected_at.map(EntityValue::Timestamp),
        unit: None,
    },
    ChargerSensor {
        description: EntityDescription::new(
            Platform::Sensor,
            "session_charging_state",
            "Charger State",
            "mdi:battery-charging",
        ),
        value: |view| {
            let text = match view.session {
                Some(session) => title_case(&session.charging_state),
                None => "Not Charging".to_string(),
            };
            Some(EntityValue::Text(text))
        },
        unit: None,
    },
    ChargerSensor {
        description: EntityDescription::new(
            Platform::Sensor,
            "session_charging_time",
            "Charging Time",
            "mdi:timer",
        )
        .state_class(StateClass::Measurement)
        .unit("s"),
        value: |view| {
            let seconds = view.session.map_or(0, |s| s.charging_time / 1000);
            Some(EntityValue::Integer(seconds as i64))
        },
        unit: None,
    },
    ChargerSensor {
        description: EntityDescription::new(
            Platform::Sensor,
            "session_charging_time_minute",
            "Charging Time (Minute)",
            "mdi:timer",
        )
        .state_class(StateClass::Measurement)
        .unit("min"),
        value: |view| {
            let minutes = view.session.map_or(0, |s| s.charging_time / 1000 / 60);
            Some(EntityValue::Integer(minutes as i64))
        },
        unit: None,
    },
    ChargerSensor {
        description: EntityDescription::new(
            Platform::Sensor,
            "session_power_kw",
            "Power Output",
            "mdi:transmission-tower",
        )
        .device_class(DeviceClass::Power)
        .state_class(StateClass::Measurement)
        .unit("kW"),
        value: |view| Some(rounded(view.session.map(|s| s.power_kw))),
        unit: None,
    },
    ChargerSensor {
        description: EntityDescription::new(
            Platform::Sensor,
            "session_energy_kwh",
            "Energy Output",
            "mdi:lightning-bolt-circle",
        )
        .device_class(DeviceClass::Energy)
        .state_class(StateClass::TotalIncreasing)
        .unit("kWh"),
        value: |view| Some(rounded(view.session.map(|s| s.energy_kwh))),
        unit: None,
    },
    ChargerSensor {
        description: EntityDescription::new(
            Platform::Sensor,
            "session_miles_added",
            "Miles Added",
            "mdi:road-variant",
        )
        .state_class(StateClass::Measurement)
        .unit("miles"),
        value: |view| Some(rounded(view.session.map(|s| s.miles_added))),
        unit: None,
    },
    ChargerSensor {
        description: EntityDescription::new(
            Platform::Sensor,
            "session_miles_added_per_hour",
            "Miles / Hour Added",
            "mdi:car-speed-limiter",
        )
        .state_class(StateClass::Measurement)
        .unit("mph"),
        value: |view| Some(rounded(view.session.map(|s| s.miles_added_per_hour))),
        unit: None,
    },
    ChargerSensor {
        description: EntityDescription::new(
            Platform::Sensor,
            "session_cost",
            "Charge Cost",
            "mdi:cash-multiple",
        )
        .device_class(DeviceClass::Monetary)
        .state_class(StateClass::Total),
        value: |view| Some(money(view.session.map_or(0.0, |s| s.total_amount))),
        // Cost is billed in the account's currency
        unit: Some(|view| view.account.account_balance.currency.clone()),
    },
];

fn money(amount: f64) -> EntityValue {
    EntityValue::Text(format!("{:.2}", amount))
}

fn rounded(value: Option<f64>) -> EntityValue {
    let value = value.unwrap_or(0.0);
    EntityValue::Float((value * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{
        AccountBalance, ChargerId, ChargingSession, HomeChargerStatus, HomeChargerTechnicalInfo,
        SessionId, User,
    };

    fn account() -> Account {
        Account {
            user: User {
                user_id: 1,
                username: "driver".to_string(),
                full_name: "Driver".to_string(),
                email: "driver@example.com".to_string(),
            },
            account_balance: AccountBalance {
                amount: 12.5,
                currency: "EUR".to_string(),
            },
        }
    }

    fn status() -> HomeChargerStatus {
        HomeChargerStatus {
            charger_id: ChargerId(42),
            brand: "CP".to_string(),
            plugged_in: true,
            connected: false,
            charging_status: "CHARGING".to_string(),
            last_connected_at: None,
            model: "CPH50-NEMA6".to_string(),
            amperage_limit: 16,
            possible_amperage_limits: vec![16, 24, 32],
        }
    }

    fn info() -> HomeChargerTechnicalInfo {
        HomeChargerTechnicalInfo {
            model_number: "CPH50".to_string(),
            serial_number: "SN".to_string(),
            mac_address: "mac".to_string(),
            software_version: "1.0".to_string(),
            last_ota_update: None,
        }
    }

    fn session() -> ChargingSession {
        ChargingSession {
            session_id: SessionId(9),
            device_id: ChargerId(42),
            device_name: "Garage".to_string(),
            charging_state: "IN_USE".to_string(),
            charging_time: 3_723_000,
            power_kw: 7.236,
            energy_kwh: 12.345,
            miles_added: 40.0,
            miles_added_per_hour: 25.555,
            total_amount: 3.1,
        }
    }

    fn value_of(key: &str, view: &ChargerView<'_>) -> Option<EntityValue> {
        let sensor = CHARGER_SENSORS
            .iter()
            .find(|s| s.description.key == key)
            .unwrap();
        (sensor.value)(view)
    }

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = CHARGER_SENSORS.iter().map(|s| s.description.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), CHARGER_SENSORS.len());
    }

    #[test]
    fn session_values_while_charging() {
        let (account, status, info, session) = (account(), status(), info(), session());
        let view = ChargerView {
            charger_id: ChargerId(42),
            account: &account,
            status: &status,
            technical_info: &info,
            session: Some(&session),
        };

        assert_eq!(
            value_of("session_charging_state", &view),
            Some(EntityValue::Text("In Use".into()))
        );
        assert_eq!(value_of("session_charging_time", &view), Some(EntityValue::Integer(3723)));
        assert_eq!(value_of("session_charging_time_minute", &view), Some(EntityValue::Integer(62)));
        assert_eq!(value_of("session_power_kw", &view), Some(EntityValue::Float(7.24)));
        assert_eq!(value_of("session_cost", &view), Some(EntityValue::Text("3.10".into())));
        assert_eq!(value_of("charging_status", &view), Some(EntityValue::Text("Charging".into())));
        assert_eq!(value_of("connected", &view), Some(EntityValue::Text("Disconnected".into())));
        assert_eq!(value_of("last_connected_at", &view), None);
    }

    #[test]
    fn idle_charger_reports_defaults() {
        let (account, status, info) = (account(), status(), info());
        let view = ChargerView {
            charger_id: ChargerId(42),
            account: &account,
            status: &status,
            technical_info: &info,
            session: None,
        };

        assert_eq!(
            value_of("session_charging_state", &view),
            Some(EntityValue::Text("Not Charging".into()))
        );
        assert_eq!(value_of("session_energy_kwh", &view), Some(EntityValue::Float(0.0)));
        assert_eq!(value_of("session_cost", &view), Some(EntityValue::Text("0.00".into())));
        assert_eq!(value_of("plugged_in", &view), Some(EntityValue::Text("Plugged In".into())));
    }

    #[test]
    fn account_balance_uses_account_currency() {
        let sensor = &ACCOUNT_SENSORS[0];
        let account = account();
        assert_eq!((sensor.value)(&account), Some(EntityValue::Text("12.50".into())));
        assert_eq!(sensor.unit.map(|u| u(&account)), Some("EUR".to_string()));
    }
}

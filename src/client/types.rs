//! Typed values returned by the ChargePoint service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Session state reported while energy is flowing
pub const CHARGER_SESSION_STATE_IN_USE: &str = "IN_USE";

/// Home charger (device) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChargerId(pub u64);

/// Charging session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for ChargerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ChargerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(ChargerId)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: u64,
    pub username: String,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub amount: f64,
    /// ISO currency code, e.g. "USD"
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user: User,
    pub account_balance: AccountBalance,
}

/// Present only while the user has a session running somewhere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserChargingStatus {
    pub session_id: SessionId,
    pub start_time: Option<DateTime<Utc>>,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargingSession {
    pub session_id: SessionId,
    /// Charger the session runs on; sessions are account-wide
    pub device_id: ChargerId,
    pub device_name: String,
    pub charging_state: String,
    /// Elapsed charging time in milliseconds
    pub charging_time: u64,
    pub power_kw: f64,
    pub energy_kwh: f64,
    pub miles_added: f64,
    pub miles_added_per_hour: f64,
    pub total_amount: f64,
}

impl ChargingSession {
    pub fn is_in_use(&self) -> bool {
        self.charging_state
            .eq_ignore_ascii_case(CHARGER_SESSION_STATE_IN_USE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeChargerStatus {
    pub charger_id: ChargerId,
    /// Short brand code, "CP" for ChargePoint
    pub brand: String,
    pub plugged_in: bool,
    pub connected: bool,
    pub charging_status: String,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub model: String,
    pub amperage_limit: u32,
    pub possible_amperage_limits: Vec<u32>,
}

impl HomeChargerStatus {
    pub fn permits_amperage(&self, amps: u32) -> bool {
        self.possible_amperage_limits.contains(&amps)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeChargerTechnicalInfo {
    pub model_number: String,
    pub serial_number: String,
    pub mac_address: String,
    pub software_version: String,
    pub last_ota_update: Option<DateTime<Utc>>,
}

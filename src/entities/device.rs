//! Device metadata for home chargers

use crate::client::{ChargerId, HomeChargerStatus, HomeChargerTechnicalInfo};
use serde::Serialize;

/// How a home charger is presented to the host device registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub manufacturer: String,
    pub model: String,
    /// Model up to the first '-', used as the entity name prefix
    pub short_model: String,
    pub name: String,
    pub sw_version: String,
}

impl DeviceInfo {
    pub fn new(
        charger_id: ChargerId,
        status: &HomeChargerStatus,
        technical_info: &HomeChargerTechnicalInfo,
    ) -> Self {
        let manufacturer = manufacturer_name(&status.brand);
        let short_model = short_model(&status.model);
        let name = if short_model.contains("CPH") {
            format!("{} Home Flex ({})", manufacturer, short_model)
        } else {
            format!("{} {}", manufacturer, short_model)
        };

        Self {
            identifier: charger_id.to_string(),
            manufacturer,
            model: status.model.clone(),
            short_model,
            name,
            sw_version: technical_info.software_version.clone(),
        }
    }
}

fn manufacturer_name(brand: &str) -> String {
    if brand == "CP" {
        "ChargePoint".to_string()
    } else {
        brand.to_string()
    }
}

fn short_model(model: &str) -> String {
    model.split('-').next().unwrap_or(model).to_string()
}

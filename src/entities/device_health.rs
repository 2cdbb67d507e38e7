//! Device health entity - Battery, signal and firmware state of a field device.
//! Owned one-to-one by a boiler or an SOS column.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Device health database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "device_health")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Battery charge in percent
    pub battery_level: f64,
    /// Signal strength in percent
    pub signal_strength: f64,
    /// Last time the device answered
    pub last_ping: DateTimeUtc,
    /// Firmware version string, e.g. `"v1.0"`
    pub firmware_version: String,
    /// Whether the device is currently reachable
    pub is_online: bool,
}

/// Defines relationships between DeviceHealth and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

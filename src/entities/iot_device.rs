//! IoT device entity - A temperature/humidity sensor reporting over HTTP.
//!
//! A device is linked to at most one of a room or a boiler. Storage does not
//! enforce this; every linking path in `core::iot` clears the other side.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What the device measures
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    /// Temperature only
    #[sea_orm(string_value = "TEMPERATURE")]
    Temperature,
    /// Humidity only
    #[sea_orm(string_value = "HUMIDITY")]
    Humidity,
    /// Temperature and humidity
    #[default]
    #[sea_orm(string_value = "BOTH")]
    Both,
}

/// IoT device database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "iot_devices")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Hardware identifier the device reports with, e.g. `ESP-1A2B3C4D`
    #[sea_orm(unique)]
    pub device_id: String,
    /// Measured quantities
    pub device_type: DeviceType,
    /// Linked room, exclusive with `boiler_id`
    #[serde(rename = "room")]
    pub room_id: Option<Uuid>,
    /// Linked boiler, exclusive with `room_id`
    #[serde(rename = "boiler")]
    pub boiler_id: Option<Uuid>,
    /// Owned installation coordinate
    #[serde(skip_serializing)]
    pub location_id: Option<i32>,
    /// Inactive devices are skipped by the sensor simulation
    pub is_active: bool,
    /// Last reported temperature in °C
    pub current_temperature: Option<f64>,
    /// Last reported relative humidity in percent
    pub current_humidity: Option<f64>,
    /// Deep-sleep interval the device announced
    pub sleep_seconds: Option<i32>,
    /// When the server last heard from the device
    pub last_seen: Option<DateTimeUtc>,
    /// Device-side timestamp of the last reading
    pub reported_at: Option<DateTimeUtc>,
}

/// Defines relationships between `IotDevice` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Linked room
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id",
        on_delete = "SetNull"
    )]
    Room,
    /// Linked boiler
    #[sea_orm(
        belongs_to = "super::boiler::Entity",
        from = "Column::BoilerId",
        to = "super::boiler::Column::Id",
        on_delete = "SetNull"
    )]
    Boiler,
    /// Owned location
    #[sea_orm(
        belongs_to = "super::coordinate::Entity",
        from = "Column::LocationId",
        to = "super::coordinate::Column::Id",
        on_delete = "SetNull"
    )]
    Location,
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl Related<super::boiler::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Boiler.def()
    }
}

impl Related<super::coordinate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

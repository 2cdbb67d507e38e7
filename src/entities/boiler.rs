//! Boiler entity - A heating unit that serves a set of rooms.
//!
//! Each boiler owns a [`device_health`](super::device_health) row and is linked
//! to rooms through [`boiler_room`](super::boiler_room).

use super::types::{Series, SensorStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Boiler database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "boilers")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Boiler name
    pub name: String,
    /// Desired relative humidity in percent
    pub target_humidity: f64,
    /// Last measured relative humidity in percent
    pub humidity: f64,
    /// Last measured temperature in °C
    pub temperature: Option<f64>,
    /// Climate status
    pub status: SensorStatus,
    /// Recent humidity values
    pub trend: Series,
    /// When the last reading arrived
    pub last_updated: Option<DateTimeUtc>,
    /// Owned device health row
    #[serde(skip_serializing)]
    pub device_health_id: Uuid,
}

/// Defines relationships between Boiler and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each boiler owns its device health row
    #[sea_orm(
        belongs_to = "super::device_health::Entity",
        from = "Column::DeviceHealthId",
        to = "super::device_health::Column::Id",
        on_delete = "Cascade"
    )]
    DeviceHealth,
    /// Room links through the `boiler_rooms` join table
    #[sea_orm(has_many = "super::boiler_room::Entity")]
    BoilerRooms,
}

impl Related<super::device_health::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceHealth.def()
    }
}

impl Related<super::boiler_room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BoilerRooms.def()
    }
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        super::boiler_room::Relation::Room.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::boiler_room::Relation::Boiler.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

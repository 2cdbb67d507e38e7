//! Room entity - A climate-controlled room heated by one or more boilers.
//!
//! `temperature`, `humidity` and `last_updated` are overwritten by IoT
//! readings from the device linked to the room.

use super::types::{Series, SensorStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Room database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rooms")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Room name
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
}

/// Defines relationships between Room and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Boiler links through the `boiler_rooms` join table
    #[sea_orm(has_many = "super::boiler_room::Entity")]
    BoilerRooms,
}

impl Related<super::boiler_room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BoilerRooms.def()
    }
}

impl Related<super::boiler::Entity> for Entity {
    fn to() -> RelationDef {
        super::boiler_room::Relation::Boiler.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::boiler_room::Relation::Room.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Moisture sensor entity - Soil moisture probe in a neighbourhood (mfy).

use super::types::SensorStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Moisture sensor database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "moisture_sensors")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owned location coordinate
    #[serde(skip_serializing)]
    pub location_id: i32,
    /// Neighbourhood (mahalla) name
    pub mfy: String,
    /// Current status
    pub status: SensorStatus,
    /// Soil moisture in %
    pub moisture_level: f64,
    /// Time of the last reading
    pub last_update: DateTimeUtc,
}

/// Defines relationships between MoistureSensor and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each sensor owns its location
    #[sea_orm(
        belongs_to = "super::coordinate::Entity",
        from = "Column::LocationId",
        to = "super::coordinate::Column::Id",
        on_delete = "Cascade"
    )]
    Location,
}

impl Related<super::coordinate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

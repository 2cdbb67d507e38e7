//! Air sensor entity - Air quality station.

use super::types::SensorStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Air sensor database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "air_sensors")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning organization, if any
    #[serde(rename = "organization")]
    pub organization_id: Option<Uuid>,
    /// Station name
    pub name: String,
    /// Neighbourhood
    pub mfy: String,
    /// Owned location coordinate
    #[serde(skip_serializing)]
    pub location_id: i32,
    /// Air quality index
    pub aqi: f64,
    /// PM2.5 concentration
    pub pm25: f64,
    /// CO2 concentration
    pub co2: f64,
    /// Health status
    pub status: SensorStatus,
}

/// Defines relationships between `AirSensor` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Optional owning organization
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id",
        on_delete = "Cascade"
    )]
    Organization,
    /// Owned location
    #[sea_orm(
        belongs_to = "super::coordinate::Entity",
        from = "Column::LocationId",
        to = "super::coordinate::Column::Id",
        on_delete = "Cascade"
    )]
    Location,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::coordinate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Truck entity - A waste collection vehicle and its driver's credentials.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Truck availability
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TruckStatus {
    /// Waiting for a job
    #[default]
    #[sea_orm(string_value = "IDLE")]
    Idle,
    /// On a collection run
    #[sea_orm(string_value = "BUSY")]
    Busy,
    /// Out of service
    #[sea_orm(string_value = "OFFLINE")]
    Offline,
}

/// Truck database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trucks")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning organization
    #[serde(rename = "organization")]
    pub organization_id: Uuid,
    /// Driver's full name
    pub driver_name: String,
    /// Licence plate
    pub plate_number: String,
    /// Driver's phone number
    pub phone: String,
    /// Cleaning zone served
    pub toza_hudud: String,
    /// Owned location coordinate
    #[serde(skip_serializing)]
    pub location_id: i32,
    /// Availability
    pub status: TruckStatus,
    /// Fuel percentage
    pub fuel_level: i32,
    /// Driver login, distinct from every organization and truck login
    pub login: String,
    /// Argon2 PHC string, never serialised
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Defines relationships between Truck and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each truck belongs to one organization
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id",
        on_delete = "Cascade"
    )]
    Organization,
    /// Each truck owns its location
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

//! Bus entity - Live telemetry of a public transport bus.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Schedule state of a bus
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusStatus {
    /// On schedule
    #[sea_orm(string_value = "ON_TIME")]
    OnTime,
    /// Behind schedule
    #[sea_orm(string_value = "DELAYED")]
    Delayed,
    /// Emergency raised on board
    #[sea_orm(string_value = "SOS")]
    Sos,
    /// Not moving
    #[sea_orm(string_value = "STOPPED")]
    Stopped,
}

/// Passenger door state
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DoorStatus {
    /// Open
    #[sea_orm(string_value = "OPEN")]
    Open,
    /// Closed
    #[sea_orm(string_value = "CLOSED")]
    Closed,
}

/// Driver fatigue estimate from the cabin camera
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FatigueLevel {
    /// Alert
    #[sea_orm(string_value = "LOW")]
    Low,
    /// Tiring
    #[sea_orm(string_value = "MEDIUM")]
    Medium,
    /// Should be relieved
    #[sea_orm(string_value = "HIGH")]
    High,
}

/// Bus database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "buses")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning organization, if any
    #[serde(rename = "organization")]
    pub organization_id: Option<Uuid>,
    /// Route served
    pub route_number: String,
    /// Licence plate
    pub plate_number: String,
    /// Driver full name
    pub driver_name: String,
    /// Owned location coordinate
    #[serde(skip_serializing)]
    pub location_id: i32,
    /// Heading in degrees
    pub bearing: f64,
    /// Speed in km/h
    pub speed: f64,
    /// Engine revolutions per minute
    pub rpm: f64,
    /// Passengers on board
    pub passengers: i32,
    /// Current status
    pub status: BusStatus,
    /// Fuel percentage
    pub fuel_level: f64,
    /// Engine temperature in °C
    pub engine_temp: f64,
    /// Door state
    pub door_status: DoorStatus,
    /// Cabin temperature in °C
    pub cabin_temp: f64,
    /// Driver fatigue estimate
    pub driver_fatigue_level: FatigueLevel,
    /// Next stop name
    pub next_stop: String,
    /// Camera streams keyed by position (`front`, `driver`, `cabin`)
    pub cctv_urls: Json,
}

/// Defines relationships between Bus and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each bus belongs to one organization
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id",
        on_delete = "Cascade"
    )]
    Organization,
    /// Each bus owns its location
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

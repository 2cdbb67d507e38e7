//! Utility node entity - A substation, pump or gas regulator.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Utility carried by the node
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UtilityType {
    /// Power
    #[sea_orm(string_value = "ELECTRICITY")]
    Electricity,
    /// Water
    #[sea_orm(string_value = "WATER")]
    Water,
    /// Gas
    #[sea_orm(string_value = "GAS")]
    Gas,
}

/// Operating state of the node
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    /// Running normally
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    /// Degraded
    #[sea_orm(string_value = "WARNING")]
    Warning,
    /// Down
    #[sea_orm(string_value = "OUTAGE")]
    Outage,
    /// Planned work
    #[sea_orm(string_value = "MAINTENANCE")]
    Maintenance,
}

/// Utility node database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "utility_nodes")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning organization, if any
    #[serde(rename = "organization")]
    pub organization_id: Option<Uuid>,
    /// Node name
    pub name: String,
    /// Utility kind
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub kind: UtilityType,
    /// Neighbourhood
    pub mfy: String,
    /// Street address
    pub address: String,
    /// Owned location coordinate
    #[serde(skip_serializing)]
    pub location_id: i32,
    /// Operating state
    pub status: NodeStatus,
    /// Load percentage
    pub load: f64,
    /// Rated capacity, free text (e.g. "630 kVA")
    pub capacity: String,
    /// Open repair tickets
    pub active_tickets: i32,
}

/// Defines relationships between `UtilityNode` and other entities
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

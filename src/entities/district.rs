//! District entity - Subdivision of a region.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// District database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "districts")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// District name
    pub name: String,
    /// Parent region
    #[serde(rename = "region")]
    pub region_id: Uuid,
    /// Owned map center
    #[serde(skip_serializing)]
    pub center_id: i32,
}

/// Defines relationships between District and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each district belongs to one region
    #[sea_orm(
        belongs_to = "super::region::Entity",
        from = "Column::RegionId",
        to = "super::region::Column::Id",
        on_delete = "Cascade"
    )]
    Region,
    /// Each district owns its center coordinate
    #[sea_orm(
        belongs_to = "super::coordinate::Entity",
        from = "Column::CenterId",
        to = "super::coordinate::Column::Id",
        on_delete = "Cascade"
    )]
    Center,
}

impl Related<super::region::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Region.def()
    }
}

impl Related<super::coordinate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Center.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

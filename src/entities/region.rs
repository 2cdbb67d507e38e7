//! Region entity - Top level of the administrative hierarchy.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Region database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "regions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Region name, e.g. "Farg'ona Viloyati"
    pub name: String,
    /// Owned map center
    #[serde(skip_serializing)]
    pub center_id: i32,
}

/// Defines relationships between Region and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each region owns its center coordinate
    #[sea_orm(
        belongs_to = "super::coordinate::Entity",
        from = "Column::CenterId",
        to = "super::coordinate::Column::Id",
        on_delete = "Cascade"
    )]
    Center,
    /// One region has many districts
    #[sea_orm(has_many = "super::district::Entity")]
    Districts,
}

impl Related<super::coordinate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Center.def()
    }
}

impl Related<super::district::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Districts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Join table between construction sites and their missions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Site-mission link
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "construction_site_missions")]
pub struct Model {
    /// Construction site
    #[sea_orm(primary_key, auto_increment = false)]
    pub site_id: Uuid,
    /// Construction mission
    #[sea_orm(primary_key, auto_increment = false)]
    pub mission_id: Uuid,
}

/// Defines relationships between Site-Mission links and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Link to the construction site
    #[sea_orm(
        belongs_to = "super::construction_site::Entity",
        from = "Column::SiteId",
        to = "super::construction_site::Column::Id",
        on_delete = "Cascade"
    )]
    Site,
    /// Link to the mission
    #[sea_orm(
        belongs_to = "super::construction_mission::Entity",
        from = "Column::MissionId",
        to = "super::construction_mission::Column::Id",
        on_delete = "Cascade"
    )]
    Mission,
}

impl Related<super::construction_site::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Site.def()
    }
}

impl Related<super::construction_mission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Mission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

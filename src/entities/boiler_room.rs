//! Join table between boilers and the rooms they heat.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Boiler-room link
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "boiler_rooms")]
pub struct Model {
    /// Boiler
    #[sea_orm(primary_key, auto_increment = false)]
    pub boiler_id: Uuid,
    /// Room
    #[sea_orm(primary_key, auto_increment = false)]
    pub room_id: Uuid,
}

/// Defines relationships between Boiler-Room links and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Link to the boiler
    #[sea_orm(
        belongs_to = "super::boiler::Entity",
        from = "Column::BoilerId",
        to = "super::boiler::Column::Id",
        on_delete = "Cascade"
    )]
    Boiler,
    /// Link to the heated room
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id",
        on_delete = "Cascade"
    )]
    Room,
}

impl Related<super::boiler::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Boiler.def()
    }
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Join table between facilities and their boilers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Facility-boiler link
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "facility_boilers")]
pub struct Model {
    /// Facility
    #[sea_orm(primary_key, auto_increment = false)]
    pub facility_id: Uuid,
    /// Boiler
    #[sea_orm(primary_key, auto_increment = false)]
    pub boiler_id: Uuid,
}

/// Defines relationships between Facility-Boiler links and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Link to the facility
    #[sea_orm(
        belongs_to = "super::facility::Entity",
        from = "Column::FacilityId",
        to = "super::facility::Column::Id",
        on_delete = "Cascade"
    )]
    Facility,
    /// Link to the boiler
    #[sea_orm(
        belongs_to = "super::boiler::Entity",
        from = "Column::BoilerId",
        to = "super::boiler::Column::Id",
        on_delete = "Cascade"
    )]
    Boiler,
}

impl Related<super::facility::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Facility.def()
    }
}

impl Related<super::boiler::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Boiler.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Join table between light poles and their regions of interest.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pole-ROI link
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "light_pole_rois")]
pub struct Model {
    /// Light pole
    #[sea_orm(primary_key, auto_increment = false)]
    pub pole_id: Uuid,
    /// Region of interest
    #[sea_orm(primary_key, auto_increment = false)]
    pub roi_id: Uuid,
}

/// Defines relationships between Pole-ROI links and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Link to the light pole
    #[sea_orm(
        belongs_to = "super::light_pole::Entity",
        from = "Column::PoleId",
        to = "super::light_pole::Column::Id",
        on_delete = "Cascade"
    )]
    Pole,
    /// Link to the ROI
    #[sea_orm(
        belongs_to = "super::light_roi::Entity",
        from = "Column::RoiId",
        to = "super::light_roi::Column::Id",
        on_delete = "Cascade"
    )]
    Roi,
}

impl Related<super::light_pole::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pole.def()
    }
}

impl Related<super::light_roi::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Roi.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

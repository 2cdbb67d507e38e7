//! Light ROI entity - A region of interest in a light pole's camera frame.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Light ROI database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "light_rois")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Left edge, relative to the frame
    pub x: f64,
    /// Top edge, relative to the frame
    pub y: f64,
    /// Width, relative to the frame
    pub width: f64,
    /// Height, relative to the frame
    pub height: f64,
    /// ROI label
    pub label: String,
}

/// Defines relationships between LightRoi and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Poles that use this ROI
    #[sea_orm(has_many = "super::pole_roi::Entity")]
    PoleRois,
}

impl Related<super::pole_roi::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PoleRois.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Light pole entity - A street light inspected through its camera.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lamp state
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LightStatus {
    /// Lit
    #[sea_orm(string_value = "ON")]
    On,
    /// Dark
    #[sea_orm(string_value = "OFF")]
    Off,
    /// Unstable
    #[sea_orm(string_value = "FLICKERING")]
    Flickering,
}

/// Light pole database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "light_poles")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning organization, if any
    #[serde(rename = "organization")]
    pub organization_id: Option<Uuid>,
    /// Owned location coordinate
    #[serde(skip_serializing)]
    pub location_id: i32,
    /// Street address
    pub address: String,
    /// Camera stream
    pub camera_url: String,
    /// Lamp state
    pub status: LightStatus,
    /// Measured luminance
    pub luminance: f64,
    /// Last inspection
    pub last_check: DateTimeUtc,
}

/// Defines relationships between `LightPole` and other entities
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
    /// ROI links through the `light_pole_rois` join table
    #[sea_orm(has_many = "super::pole_roi::Entity")]
    PoleRois,
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

impl Related<super::pole_roi::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PoleRois.def()
    }
}

impl Related<super::light_roi::Entity> for Entity {
    fn to() -> RelationDef {
        super::pole_roi::Relation::Roi.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::pole_roi::Relation::Pole.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

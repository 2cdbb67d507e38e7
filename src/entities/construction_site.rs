//! Construction site entity - A building project watched by a camera.
//!
//! `detected_objects` holds counts reported by the camera model, e.g.
//! `{"workers": 12, "cranes": 1, "trucks": 3}`.

use super::construction_mission::StageType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Overall schedule health
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteStatus {
    /// On schedule
    #[sea_orm(string_value = "ON_TRACK")]
    OnTrack,
    /// Slipping
    #[sea_orm(string_value = "WARNING")]
    Warning,
    /// Seriously late
    #[sea_orm(string_value = "CRITICAL")]
    Critical,
}

/// Construction site database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "construction_sites")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning organization, if any
    #[serde(rename = "organization")]
    pub organization_id: Option<Uuid>,
    /// Project name
    pub name: String,
    /// Street address
    pub address: String,
    /// Contractor
    pub contractor_name: String,
    /// Camera stream
    pub camera_url: String,
    /// Project start
    pub start_date: DateTimeUtc,
    /// Schedule health
    pub status: SiteStatus,
    /// Completion percentage, 0..=100
    pub overall_progress: f64,
    /// Stage the camera model believes the site is at
    pub current_ai_stage: StageType,
    /// Confidence of that belief
    pub ai_confidence: f64,
    /// Object counts from the camera model
    pub detected_objects: Json,
}

/// Defines relationships between `ConstructionSite` and other entities
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
    /// Mission links through the `construction_site_missions` join table
    #[sea_orm(has_many = "super::site_mission::Entity")]
    SiteMissions,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::site_mission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SiteMissions.def()
    }
}

impl Related<super::construction_mission::Entity> for Entity {
    fn to() -> RelationDef {
        super::site_mission::Relation::Mission.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::site_mission::Relation::Site.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Eco violation entity - A littering or dumping incident caught on camera,
//! optionally matched to a known offender.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Offender gender as estimated by face matching
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    /// Male
    #[sea_orm(string_value = "MALE")]
    Male,
    /// Female
    #[sea_orm(string_value = "FEMALE")]
    Female,
}

/// Eco violation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "eco_violations")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning organization, if any
    #[serde(rename = "organization")]
    pub organization_id: Option<Uuid>,
    /// Human-readable place name
    pub location_name: String,
    /// Neighbourhood (MFY) name
    pub mfy: String,
    /// When the incident was recorded
    pub timestamp: DateTimeUtc,
    /// Image URL
    pub image_url: String,
    /// Detection confidence
    pub confidence: f64,
    /// Identified offender, if any
    pub offender_name: Option<String>,
    /// Face-recognition id
    pub face_id: Option<String>,
    /// Cropped face image URL
    pub face_image_url: Option<String>,
    /// Face match score
    pub match_score: Option<f64>,
    /// Estimated offender age
    pub estimated_age: Option<i32>,
    /// Estimated offender gender
    pub gender: Option<Gender>,
}

/// Defines relationships between EcoViolation and other entities
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
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

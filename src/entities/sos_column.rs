//! SOS column entity - Emergency call column with a camera and on-device AI.
//!
//! The `ai_*` fields are filled by the column's analysis of the last call and
//! are absent until the first one.

use super::types::Labels;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether the column is in use
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SosStatus {
    /// Waiting
    #[sea_orm(string_value = "IDLE")]
    Idle,
    /// A call is in progress
    #[sea_orm(string_value = "ACTIVE")]
    Active,
}

/// SOS column database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sos_columns")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning organization, if any
    #[serde(rename = "organization")]
    pub organization_id: Option<Uuid>,
    /// Column name
    pub name: String,
    /// Owned location coordinate
    #[serde(skip_serializing)]
    pub location_id: i32,
    /// Neighbourhood
    pub mfy: String,
    /// Call state
    pub status: SosStatus,
    /// Camera stream
    pub camera_url: String,
    /// Last self-test
    pub last_test: DateTimeUtc,
    /// Owned device health row
    #[serde(skip_serializing)]
    pub device_health_id: Uuid,
    /// Confidence of the last analysis
    pub ai_confidence: Option<f64>,
    /// Estimated caller stress level
    pub ai_stress_level: Option<f64>,
    /// Objects seen by the camera
    pub ai_detected_objects: Option<Labels>,
    /// Keywords heard in the call
    pub ai_keywords: Option<Labels>,
}

/// Defines relationships between `SosColumn` and other entities
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
    /// Owned device health
    #[sea_orm(
        belongs_to = "super::device_health::Entity",
        from = "Column::DeviceHealthId",
        to = "super::device_health::Column::Id",
        on_delete = "Cascade"
    )]
    DeviceHealth,
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

impl Related<super::device_health::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceHealth.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Construction mission entity - One stage of a construction site's schedule.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Construction stage, in build order
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum StageType {
    /// Excavation pit
    #[sea_orm(string_value = "KOTLOVAN")]
    #[serde(rename = "KOTLOVAN")]
    Kotlovan,
    /// Foundation
    #[sea_orm(string_value = "FUNDAMENT")]
    #[serde(rename = "FUNDAMENT")]
    Fundament,
    /// First floor frame
    #[sea_orm(string_value = "KARKAS_1")]
    #[serde(rename = "KARKAS_1")]
    Karkas1,
    /// Full frame
    #[sea_orm(string_value = "KARKAS_FULL")]
    #[serde(rename = "KARKAS_FULL")]
    KarkasFull,
    /// Roofing
    #[sea_orm(string_value = "TOM_YOPISH")]
    #[serde(rename = "TOM_YOPISH")]
    TomYopish,
    /// Finishing
    #[sea_orm(string_value = "PARDOZLASH")]
    #[serde(rename = "PARDOZLASH")]
    Pardozlash,
}

/// Mission progress state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    /// Not started
    #[default]
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Under way
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    /// Done
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    /// Behind schedule
    #[sea_orm(string_value = "DELAYED")]
    Delayed,
}

/// Construction mission database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "construction_missions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human readable stage name
    pub stage_name: String,
    /// Stage kind
    pub stage_type: StageType,
    /// Planned completion
    pub deadline: DateTimeUtc,
    /// Progress state
    pub status: MissionStatus,
    /// Completion percentage, 0..=100
    pub progress: f64,
}

/// Defines relationships between ConstructionMission and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Site links through the `construction_site_missions` join table
    #[sea_orm(has_many = "super::site_mission::Entity")]
    SiteMissions,
}

impl Related<super::site_mission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SiteMissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

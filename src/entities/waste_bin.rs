//! Waste bin entity - A monitored street container.
//!
//! `fill_level` is a percentage in 0..=100. `is_full` is stored separately and
//! normally tracks `fill_level > 80`; writers that only touch the level derive
//! it, writers that set it explicitly are honoured. `device_health` is a free
//! JSON blob reported by the bin's sensor, not a foreign key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Where the latest bin image came from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageSource {
    /// Street camera
    #[default]
    #[sea_orm(string_value = "CCTV")]
    Cctv,
    /// Pushed by the messenger bot
    #[sea_orm(string_value = "BOT")]
    Bot,
}

/// Waste bin database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "waste_bins")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning organization
    #[serde(rename = "organization")]
    pub organization_id: Uuid,
    /// Street address
    pub address: String,
    /// Owned location coordinate
    #[serde(skip_serializing)]
    pub location_id: i32,
    /// Cleaning zone the bin belongs to
    pub toza_hudud: String,
    /// Camera stream watching the bin
    pub camera_url: Option<String>,
    /// Link to the bin on Google Maps
    pub google_maps_url: Option<String>,
    /// Fill percentage, 0..=100
    pub fill_level: i32,
    /// Expected fill growth per hour
    pub fill_rate: f64,
    /// Free-text summary of the last analysis
    pub last_analysis: String,
    /// Latest image of the bin
    pub image_url: Option<String>,
    /// Source of `image_url`
    pub image_source: ImageSource,
    /// Whether the bin needs collecting
    pub is_full: bool,
    /// Sensor health blob
    pub device_health: Json,
}

/// Defines relationships between `WasteBin` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each bin belongs to one organization
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id",
        on_delete = "Cascade"
    )]
    Organization,
    /// Each bin owns its location
    #[sea_orm(
        belongs_to = "super::coordinate::Entity",
        from = "Column::LocationId",
        to = "super::coordinate::Column::Id",
        on_delete = "Cascade"
    )]
    Location,
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

impl ActiveModelBehavior for ActiveModel {}

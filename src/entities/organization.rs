//! Organization entity - The tenant boundary of the system.
//!
//! Every tenant-owned row (bins, trucks, sensors, ...) carries an
//! `organization_id`; sessions opened with organization credentials only see
//! their own rows. The login is unique across organizations.

use super::types::ModuleList;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of organization
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationType {
    /// Municipal administration
    #[sea_orm(string_value = "HOKIMIYAT")]
    Hokimiyat,
    /// Government agency
    #[sea_orm(string_value = "AGENCY")]
    Agency,
    /// Contracted enterprise
    #[sea_orm(string_value = "ENTERPRISE")]
    Enterprise,
}

/// Organization database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Organization kind
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub kind: OrganizationType,
    /// Login used at `/auth/login/`, unique across organizations
    #[sea_orm(unique)]
    pub login: String,
    /// Argon2 PHC string, never serialised
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Region the organization belongs to
    #[serde(rename = "region")]
    pub region_id: Uuid,
    /// District the organization belongs to
    #[serde(rename = "district")]
    pub district_id: Uuid,
    /// Owned map center
    #[serde(skip_serializing)]
    pub center_id: i32,
    /// Feature modules shown to this tenant
    pub enabled_modules: ModuleList,
    /// Creation time
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Organization and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each organization belongs to one region
    #[sea_orm(
        belongs_to = "super::region::Entity",
        from = "Column::RegionId",
        to = "super::region::Column::Id",
        on_delete = "Cascade"
    )]
    Region,
    /// Each organization belongs to one district
    #[sea_orm(
        belongs_to = "super::district::Entity",
        from = "Column::DistrictId",
        to = "super::district::Column::Id",
        on_delete = "Cascade"
    )]
    District,
    /// Each organization owns its center coordinate
    #[sea_orm(
        belongs_to = "super::coordinate::Entity",
        from = "Column::CenterId",
        to = "super::coordinate::Column::Id",
        on_delete = "Cascade"
    )]
    Center,
    /// One organization owns many waste bins
    #[sea_orm(has_many = "super::waste_bin::Entity")]
    WasteBins,
    /// One organization owns many trucks
    #[sea_orm(has_many = "super::truck::Entity")]
    Trucks,
}

impl Related<super::region::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Region.def()
    }
}

impl Related<super::district::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::District.def()
    }
}

impl Related<super::coordinate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Center.def()
    }
}

impl Related<super::waste_bin::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WasteBins.def()
    }
}

impl Related<super::truck::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trucks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

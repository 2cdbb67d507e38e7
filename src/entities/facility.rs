//! Facility entity - A school, kindergarten or hospital and the boilers that heat it.

use super::types::{Series, SensorStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of facility
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FacilityType {
    /// School
    #[sea_orm(string_value = "SCHOOL")]
    School,
    /// Kindergarten
    #[sea_orm(string_value = "KINDERGARTEN")]
    Kindergarten,
    /// Hospital
    #[sea_orm(string_value = "HOSPITAL")]
    Hospital,
}

/// Facility database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "facilities")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Facility name
    pub name: String,
    /// Facility kind
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub kind: FacilityType,
    /// Neighbourhood
    pub mfy: String,
    /// Aggregate climate status
    pub overall_status: SensorStatus,
    /// Energy usage, kWh
    pub energy_usage: f64,
    /// Efficiency score, 0..=100
    pub efficiency_score: f64,
    /// Person in charge
    pub manager_name: String,
    /// Last maintenance visit
    pub last_maintenance: DateTimeUtc,
    /// Recent energy usage values
    pub history: Series,
}

/// Defines relationships between Facility and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Boiler links through the `facility_boilers` join table
    #[sea_orm(has_many = "super::facility_boiler::Entity")]
    FacilityBoilers,
}

impl Related<super::facility_boiler::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FacilityBoilers.def()
    }
}

impl Related<super::boiler::Entity> for Entity {
    fn to() -> RelationDef {
        super::facility_boiler::Relation::Boiler.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::facility_boiler::Relation::Facility.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Report entry entity - One line of the analytics report.

use super::types::SensorStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report entry database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report_entries")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// When it happened
    pub timestamp: DateTimeUtc,
    /// Neighbourhood (MFY) name
    pub mfy: String,
    /// Human-readable place name
    pub location_name: String,
    /// Category
    pub category: String,
    /// Metric shown in the report
    pub metric_label: String,
    /// Metric value, numeric or free text
    pub value: String,
    /// Estimated cost, free text
    pub cost_impact: Option<String>,
    /// Current status
    pub status: SensorStatus,
    /// Responsible party
    pub responsible: String,
}

/// Defines relationships between ReportEntry and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

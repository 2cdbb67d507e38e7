//! Responsible organization entity - A service (ambulance, gas, water, ...)
//! that call requests can be assigned to, with its brigade capacity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Responsible organization database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "responsible_orgs")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Service name
    pub name: String,
    /// Free-text service kind
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    /// Brigades currently dispatched
    pub active_brigades: i32,
    /// Brigades available in total
    pub total_brigades: i32,
    /// Load percentage
    pub current_load: f64,
    /// Dispatcher phone
    pub contact_phone: String,
}

/// Defines relationships between ResponsibleOrg and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

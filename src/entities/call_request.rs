//! Call request entity - A citizen's call to the call center, transcribed and
//! categorised, optionally assigned to an organization.
//!
//! The handling history lives in [`call_request_timeline`](super::call_request_timeline).

use super::types::Labels;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which service the request concerns
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestCategory {
    /// Ambulance / health
    #[sea_orm(string_value = "HEALTH")]
    Health,
    /// Police / interior
    #[sea_orm(string_value = "INTERIOR")]
    Interior,
    /// Waste collection
    #[sea_orm(string_value = "WASTE")]
    Waste,
    /// Power supply
    #[sea_orm(string_value = "ELECTRICITY")]
    Electricity,
    /// Water supply
    #[sea_orm(string_value = "WATER")]
    Water,
    /// Gas supply
    #[sea_orm(string_value = "GAS")]
    Gas,
    /// Anything else
    #[sea_orm(string_value = "OTHER")]
    Other,
}

/// Handling state of a request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Just received
    #[default]
    #[sea_orm(string_value = "NEW")]
    New,
    /// Handed to an organization
    #[sea_orm(string_value = "ASSIGNED")]
    Assigned,
    /// Being worked on
    #[sea_orm(string_value = "PROCESSING")]
    Processing,
    /// Fixed
    #[sea_orm(string_value = "RESOLVED")]
    Resolved,
    /// Closed without further action
    #[sea_orm(string_value = "CLOSED")]
    Closed,
}

/// Call request database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "call_requests")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Caller's name
    pub citizen_name: String,
    /// Caller's phone
    pub phone: String,
    /// Call transcript
    pub transcript: String,
    /// Service category
    pub category: RequestCategory,
    /// Handling state
    pub status: RequestStatus,
    /// When the call came in
    pub timestamp: DateTimeUtc,
    /// Address mentioned in the call
    pub address: Option<String>,
    /// Neighbourhood
    pub mfy: String,
    /// Generated summary of the call
    pub ai_summary: String,
    /// Extracted keywords
    pub keywords: Labels,
    /// Caller trust score
    pub citizen_trust_score: f64,
    /// Organization the request is assigned to
    #[serde(rename = "assigned_org")]
    pub assigned_org_id: Option<Uuid>,
    /// Resolution deadline
    pub deadline: Option<DateTimeUtc>,
}

/// Defines relationships between `CallRequest` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Assignment survives the organization's deletion as unassigned
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::AssignedOrgId",
        to = "super::organization::Column::Id",
        on_delete = "SetNull"
    )]
    AssignedOrg,
    /// One request has many timeline steps
    #[sea_orm(has_many = "super::call_request_timeline::Entity")]
    Timeline,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssignedOrg.def()
    }
}

impl Related<super::call_request_timeline::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Timeline.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

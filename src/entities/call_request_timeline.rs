//! Call request timeline entity - One step in handling a call request.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Step completion
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineStatus {
    /// Step completed
    #[sea_orm(string_value = "DONE")]
    Done,
    /// Step outstanding
    #[sea_orm(string_value = "PENDING")]
    Pending,
}

/// Timeline step database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "call_request_timelines")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Parent request
    #[serde(rename = "call_request")]
    pub call_request_id: Uuid,
    /// Step description
    pub step: String,
    /// When it happened
    pub timestamp: DateTimeUtc,
    /// Who performed the step
    pub actor: String,
    /// Current status
    pub status: TimelineStatus,
}

/// Defines relationships between CallRequestTimeline and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each step belongs to one request
    #[sea_orm(
        belongs_to = "super::call_request::Entity",
        from = "Column::CallRequestId",
        to = "super::call_request::Column::Id",
        on_delete = "Cascade"
    )]
    CallRequest,
}

impl Related<super::call_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CallRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

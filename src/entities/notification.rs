//! Notification entity - A message addressed to one user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification severity
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// Informational
    #[sea_orm(string_value = "INFO")]
    Info,
    /// Needs attention
    #[sea_orm(string_value = "WARNING")]
    Warning,
    /// Needs immediate attention
    #[sea_orm(string_value = "CRITICAL")]
    Critical,
}

/// Notification database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Short title
    pub title: String,
    /// Body text
    pub message: String,
    /// Set when the notification is created
    pub timestamp: DateTimeUtc,
    /// Severity
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Whether the recipient has read it
    pub read: bool,
    /// Recipient
    #[serde(rename = "user")]
    pub user_id: Uuid,
}

/// Defines relationships between Notification and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each notification belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

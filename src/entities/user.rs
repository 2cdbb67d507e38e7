//! User entity - A login principal.
//!
//! Administrative users carry a password hash. Organization and driver
//! logins get a password-less shadow user so tokens and notifications have a
//! single owner table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Unique username
    #[sea_orm(unique)]
    pub username: String,
    /// Argon2 PHC string; `None` for shadow users
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Superusers authenticate with the SUPERADMIN role
    pub is_superuser: bool,
    /// Creation time
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many notifications
    #[sea_orm(has_many = "super::notification::Entity")]
    Notifications,
    /// One user has at most one token
    #[sea_orm(has_many = "super::auth_token::Entity")]
    Tokens,
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl Related<super::auth_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

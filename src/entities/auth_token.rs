//! Auth token entity - The session store.
//!
//! A token binds a user to the role and tenant it logged in as. Requests
//! present the key in the `Authorization` header.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role a session was opened with
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Tenant login
    #[sea_orm(string_value = "ORGANIZATION")]
    Organization,
    /// Truck driver login
    #[sea_orm(string_value = "DRIVER")]
    Driver,
    /// Superuser
    #[sea_orm(string_value = "SUPERADMIN")]
    Superadmin,
    /// Staff user
    #[sea_orm(string_value = "ADMIN")]
    Admin,
}

/// Auth token database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "auth_tokens")]
pub struct Model {
    /// 40 hex characters
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// Token owner, one token per user
    #[sea_orm(unique)]
    pub user_id: Uuid,
    /// Role the session was opened with
    pub role: Role,
    /// Tenant bound to the session; `None` means unrestricted
    pub organization_id: Option<Uuid>,
    /// Truck, for driver sessions
    pub truck_id: Option<Uuid>,
    /// Issue time, used for expiry
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `AuthToken` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each token belongs to one user
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

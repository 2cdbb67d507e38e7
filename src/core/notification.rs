//! Per-user notifications.
//!
//! Unlike the other resources, visibility here follows the user rather than
//! the organization: a caller works with their own notifications, and only
//! an unrestricted session sees everyone's.

use super::auth::Session;
use super::tenant::Scope;
use super::validation::{Checker, REQUIRED, WriteMode, assign, ensure_references};
use crate::entities::notification::NotificationType;
use crate::entities::{
    Notification, NotificationColumn, NotificationModel, User, notification,
};
use crate::errors::{Error, Result};
use chrono::Utc;
use sea_orm::{
    Condition, ConnectionTrait, DatabaseConnection, QueryOrder, Set, prelude::*,
};
use serde::Deserialize;
use tracing::debug;

/// Whose notifications a caller may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Audience {
    /// Calling user
    pub user_id: Uuid,
    /// Tenant scope of the session
    pub scope: Scope,
}

impl Audience {
    fn condition(self) -> Condition {
        match self.scope {
            Scope::All => Condition::all(),
            Scope::Organization(_) => Condition::all().add(NotificationColumn::UserId.eq(self.user_id)),
        }
    }

    fn ensure(self, notification: &NotificationModel) -> Result<()> {
        if self.scope.is_unrestricted() || notification.user_id == self.user_id {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }
}

impl From<&Session> for Audience {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id,
            scope: session.scope(),
        }
    }
}

/// Notification write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationInput {
    /// Short title
    pub title: Option<String>,
    /// Body text
    pub message: Option<String>,
    /// Notification type
    #[serde(rename = "type")]
    pub kind: Option<NotificationType>,
    /// Whether the user has seen it
    pub read: Option<bool>,
    /// Recipient; defaults to the caller, only honoured for unrestricted callers
    pub user: Option<Uuid>,
}

impl NotificationInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("title", self.title.as_ref());
        checker.text("message", self.message.as_ref());
        checker.required("type", self.kind.as_ref());
        checker.finish()
    }
}

async fn find<C: ConnectionTrait>(db: &C, audience: Audience, id: Uuid) -> Result<NotificationModel> {
    let notification = Notification::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Notification", id))?;
    audience.ensure(&notification)?;
    Ok(notification)
}

/// Notifications visible to the caller, newest first.
pub async fn list(db: &DatabaseConnection, audience: Audience) -> Result<Vec<NotificationModel>> {
    Ok(Notification::find()
        .filter(audience.condition())
        .order_by_desc(NotificationColumn::Timestamp)
        .all(db)
        .await?)
}

/// Unread notifications visible to the caller, newest first.
pub async fn unread(db: &DatabaseConnection, audience: Audience) -> Result<Vec<NotificationModel>> {
    Ok(Notification::find()
        .filter(audience.condition())
        .filter(NotificationColumn::Read.eq(false))
        .order_by_desc(NotificationColumn::Timestamp)
        .all(db)
        .await?)
}

/// One notification.
pub async fn retrieve(db: &DatabaseConnection, audience: Audience, id: Uuid) -> Result<NotificationModel> {
    find(db, audience, id).await
}

/// Creates a notification; the timestamp is always the insert time.
pub async fn create(
    db: &DatabaseConnection,
    audience: Audience,
    input: NotificationInput,
) -> Result<NotificationModel> {
    input.validate(WriteMode::Create)?;
    let recipient = match audience.scope {
        Scope::All => input.user.unwrap_or(audience.user_id),
        Scope::Organization(_) => audience.user_id,
    };
    ensure_references::<User, _>(db, "user", &[recipient]).await?;
    let (Some(title), Some(message), Some(kind)) = (input.title, input.message, input.kind) else {
        return Err(Error::field("title", REQUIRED));
    };
    notify(db, recipient, title, message, kind, input.read.unwrap_or(false)).await
}

/// Inserts a notification for `user_id`.
pub async fn notify<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    title: String,
    message: String,
    kind: NotificationType,
    read: bool,
) -> Result<NotificationModel> {
    let notification = notification::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        message: Set(message),
        timestamp: Set(Utc::now()),
        kind: Set(kind),
        read: Set(read),
        user_id: Set(user_id),
    }
    .insert(db)
    .await?;
    debug!(user = %user_id, title = %notification.title, "Notification stored");
    Ok(notification)
}

/// Full or partial update; the recipient and timestamp never change.
pub async fn update(
    db: &DatabaseConnection,
    audience: Audience,
    id: Uuid,
    input: NotificationInput,
    mode: WriteMode,
) -> Result<NotificationModel> {
    input.validate(mode)?;
    let mut active: notification::ActiveModel = find(db, audience, id).await?.into();
    assign(&mut active.title, input.title);
    assign(&mut active.message, input.message);
    assign(&mut active.kind, input.kind);
    assign(&mut active.read, input.read);
    Ok(active.update(db).await?)
}

/// Deletes a notification.
pub async fn delete(db: &DatabaseConnection, audience: Audience, id: Uuid) -> Result<()> {
    find(db, audience, id).await?;
    Notification::delete_by_id(id).exec(db).await?;
    Ok(())
}

/// Marks a notification as read.
pub async fn mark_read(db: &DatabaseConnection, audience: Audience, id: Uuid) -> Result<NotificationModel> {
    let notification = find(db, audience, id).await?;
    if notification.read {
        return Ok(notification);
    }
    let mut active: notification::ActiveModel = notification.into();
    active.read = Set(true);
    Ok(active.update(db).await?)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::auth::create_admin;
    use crate::test_utils::*;

    fn input(title: &str) -> NotificationInput {
        NotificationInput {
            title: Some(title.into()),
            message: Some("Konteyner to'ldi".into()),
            kind: Some(NotificationType::Warning),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_users_see_only_their_notifications() -> Result<()> {
        let db = setup_test_db().await?;
        let (alice, _) = create_admin(&db, "alice", TEST_PASSWORD, false).await?;
        let (bob, _) = create_admin(&db, "bob", TEST_PASSWORD, false).await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        let scope = Scope::Organization(org.item.id);
        let alice_view = Audience { user_id: alice.id, scope };
        let bob_view = Audience { user_id: bob.id, scope };

        let mine = create(&db, alice_view, input("Alice")).await?;
        create(&db, bob_view, input("Bob")).await?;

        let listed = list(&db, alice_view).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);
        assert!(matches!(retrieve(&db, bob_view, mine.id).await, Err(Error::Forbidden)));

        let everyone = Audience { user_id: alice.id, scope: Scope::All };
        assert_eq!(list(&db, everyone).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_restricted_caller_cannot_target_others() -> Result<()> {
        let db = setup_test_db().await?;
        let (alice, _) = create_admin(&db, "alice", TEST_PASSWORD, false).await?;
        let (bob, _) = create_admin(&db, "bob", TEST_PASSWORD, false).await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        let alice_view = Audience {
            user_id: alice.id,
            scope: Scope::Organization(org.item.id),
        };

        let mut targeted = input("Hello");
        targeted.user = Some(bob.id);
        let created = create(&db, alice_view, targeted).await?;
        assert_eq!(created.user_id, alice.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_read_and_unread_listing() -> Result<()> {
        let db = setup_test_db().await?;
        let (admin, _) = create_admin(&db, "admin", TEST_PASSWORD, false).await?;
        let audience = Audience {
            user_id: admin.id,
            scope: Scope::All,
        };
        let first = create(&db, audience, input("One")).await?;
        create(&db, audience, input("Two")).await?;
        assert!(!first.read);
        assert_eq!(unread(&db, audience).await?.len(), 2);

        let read = mark_read(&db, audience, first.id).await?;
        assert!(read.read);
        assert_eq!(read.timestamp, first.timestamp);
        let remaining = unread(&db, audience).await?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title, "Two");
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_recipient_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let (admin, _) = create_admin(&db, "admin", TEST_PASSWORD, false).await?;
        let audience = Audience {
            user_id: admin.id,
            scope: Scope::All,
        };
        let mut targeted = input("Hello");
        targeted.user = Some(Uuid::new_v4());
        let result = create(&db, audience, targeted).await;
        let Err(Error::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.contains("user"));
        Ok(())
    }
}

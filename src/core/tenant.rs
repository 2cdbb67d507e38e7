//! Tenant scoping - Which organization's rows a caller may see and touch.
//!
//! A session opened with organization (or driver) credentials is bound to one
//! organization. Every list of tenant-owned rows is filtered by it, every
//! detail access to another tenant's row is refused, and every create is
//! forced into it. A session with no organization sees everything.

use crate::errors::{Error, Result};
use sea_orm::{ColumnTrait, Condition};
use uuid::Uuid;

/// Visibility of tenant-owned rows for one caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Superadmin / admin: no filtering
    All,
    /// Restricted to one organization
    Organization(Uuid),
}

impl Scope {
    /// Builds the scope from the organization bound to a session.
    #[must_use]
    pub const fn from_organization(organization_id: Option<Uuid>) -> Self {
        match organization_id {
            Some(id) => Self::Organization(id),
            None => Self::All,
        }
    }

    /// The bound organization, if any.
    #[must_use]
    pub const fn organization_id(self) -> Option<Uuid> {
        match self {
            Self::All => None,
            Self::Organization(id) => Some(id),
        }
    }

    /// Whether this scope sees every row.
    #[must_use]
    pub const fn is_unrestricted(self) -> bool {
        matches!(self, Self::All)
    }

    /// Filter condition on an owner column.
    ///
    /// Under [`Scope::All`] this is the empty (always true) condition.
    pub fn condition<C: ColumnTrait>(self, column: C) -> Condition {
        match self {
            Self::All => Condition::all(),
            Self::Organization(id) => Condition::all().add(column.eq(id)),
        }
    }

    /// Whether a row owned by `owner` is visible.
    ///
    /// Rows without an owner are only visible to [`Scope::All`].
    #[must_use]
    pub fn permits(self, owner: Option<Uuid>) -> bool {
        match self {
            Self::All => true,
            Self::Organization(id) => owner == Some(id),
        }
    }

    /// `Err(Forbidden)` unless [`Scope::permits`] the owner.
    pub fn ensure(self, owner: Option<Uuid>) -> Result<()> {
        if self.permits(owner) {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }

    /// `Err(Forbidden)` unless this is [`Scope::All`].
    pub const fn ensure_unrestricted(self) -> Result<()> {
        match self {
            Self::All => Ok(()),
            Self::Organization(_) => Err(Error::Forbidden),
        }
    }

    /// Owner a newly created row gets.
    ///
    /// A tenant always creates into its own organization regardless of what
    /// the payload asks for.
    #[must_use]
    pub const fn owner_for_create(self, requested: Option<Uuid>) -> Option<Uuid> {
        match self {
            Self::All => requested,
            Self::Organization(id) => Some(id),
        }
    }

    /// Owner after an update: a tenant cannot move rows out of its organization.
    #[must_use]
    pub const fn owner_for_update(self, current: Option<Uuid>, requested: Option<Uuid>) -> Option<Uuid> {
        match (self, requested) {
            (Self::All, Some(requested)) => Some(requested),
            _ => current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_from_session() {
        let org = Uuid::new_v4();
        assert_eq!(Scope::from_organization(None), Scope::All);
        assert_eq!(Scope::from_organization(Some(org)), Scope::Organization(org));
        assert_eq!(Scope::Organization(org).organization_id(), Some(org));
        assert!(Scope::All.is_unrestricted());
    }

    #[test]
    fn test_tenant_only_sees_own_rows() {
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();
        let scope = Scope::Organization(mine);

        assert!(scope.permits(Some(mine)));
        assert!(!scope.permits(Some(theirs)));
        assert!(!scope.permits(None));
        assert!(matches!(scope.ensure(Some(theirs)), Err(Error::Forbidden)));
        assert!(matches!(scope.ensure_unrestricted(), Err(Error::Forbidden)));

        assert!(Scope::All.permits(None));
        assert!(Scope::All.permits(Some(theirs)));
    }

    #[test]
    fn test_tenant_creates_into_own_organization() {
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();

        assert_eq!(Scope::Organization(mine).owner_for_create(Some(theirs)), Some(mine));
        assert_eq!(Scope::Organization(mine).owner_for_create(None), Some(mine));
        assert_eq!(Scope::All.owner_for_create(Some(theirs)), Some(theirs));
        assert_eq!(Scope::All.owner_for_create(None), None);

        assert_eq!(
            Scope::Organization(mine).owner_for_update(Some(mine), Some(theirs)),
            Some(mine)
        );
        assert_eq!(Scope::All.owner_for_update(Some(mine), Some(theirs)), Some(theirs));
        assert_eq!(Scope::All.owner_for_update(Some(mine), None), Some(mine));
    }
}

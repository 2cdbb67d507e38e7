//! Authentication - credential checks, session tokens and admin users.
//!
//! A login is tried against four stores in order: organization logins, truck
//! driver logins, the configured superadmin bypass, and administrative users.
//! Every successful login is tied to a row in `users` (a password-less shadow
//! user for organizations and drivers) which owns exactly one token. The
//! token remembers the role and the tenant the session was opened for.

use super::organization::{self, OrganizationView};
use crate::config::app::AuthConfig;
use crate::entities::auth_token::Role;
use crate::entities::types::Module;
use crate::entities::{
    AuthToken, AuthTokenColumn, AuthTokenModel, Organization, OrganizationColumn, Truck,
    TruckColumn, User, UserColumn, UserModel, auth_token, user,
};
use crate::errors::{Error, Result};
use crate::core::tenant::Scope;
use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::Utc;
use rand::Rng;
use sea_orm::{ConnectionTrait, DatabaseConnection, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Hashes a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt_bytes: [u8; 16] = rand::rng().random();
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| Error::PasswordHash {
        message: e.to_string(),
    })?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash {
            message: e.to_string(),
        })
}

/// Checks a password against a stored PHC string. Malformed hashes never match.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// A fresh 40 character hex token key.
#[must_use]
pub fn generate_token_key() -> String {
    let bytes: [u8; 20] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// The principal part of a login response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginUser {
    /// Organization, truck or user id
    pub id: String,
    /// Display name
    pub name: String,
    /// Session role
    pub role: Role,
    /// Modules the client should show
    pub enabled_modules: Vec<Module>,
}

/// Successful login response body
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Always `true`
    pub success: bool,
    /// Token for the `Authorization` header
    pub token: String,
    /// Who logged in
    pub user: LoginUser,
    /// The tenant, for organization logins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationView>,
}

/// An authenticated request's session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Token key
    pub token: String,
    /// Token owner
    pub user_id: Uuid,
    /// Role the session was opened with
    pub role: Role,
    /// Bound tenant
    pub organization_id: Option<Uuid>,
    /// Truck, for driver sessions
    pub truck_id: Option<Uuid>,
}

impl Session {
    /// Tenant visibility of this session.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        Scope::from_organization(self.organization_id)
    }
}

impl From<AuthTokenModel> for Session {
    fn from(token: AuthTokenModel) -> Self {
        Self {
            token: token.key,
            user_id: token.user_id,
            role: token.role,
            organization_id: token.organization_id,
            truck_id: token.truck_id,
        }
    }
}

async fn shadow_user<C: ConnectionTrait>(db: &C, username: &str, is_superuser: bool) -> Result<UserModel> {
    if let Some(existing) = User::find()
        .filter(UserColumn::Username.eq(username))
        .one(db)
        .await?
    {
        return Ok(existing);
    }
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        password_hash: Set(None),
        is_superuser: Set(is_superuser),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Returns the user's live token, refreshed for this login, or issues a new one.
///
/// A token bound to another tenant or truck is never reused.
async fn issue_token<C: ConnectionTrait>(
    db: &C,
    config: &AuthConfig,
    user_id: Uuid,
    role: Role,
    organization_id: Option<Uuid>,
    truck_id: Option<Uuid>,
) -> Result<String> {
    let existing = AuthToken::find()
        .filter(AuthTokenColumn::UserId.eq(user_id))
        .one(db)
        .await?;

    if let Some(token) = existing {
        let same_principal =
            token.organization_id == organization_id && token.truck_id == truck_id;
        if same_principal && token.created_at + config.token_ttl() > Utc::now() {
            let key = token.key.clone();
            let mut active: auth_token::ActiveModel = token.into();
            active.role = Set(role);
            active.organization_id = Set(organization_id);
            active.truck_id = Set(truck_id);
            active.update(db).await?;
            return Ok(key);
        }
        AuthToken::delete_by_id(token.key).exec(db).await?;
    }

    let token = auth_token::ActiveModel {
        key: Set(generate_token_key()),
        user_id: Set(user_id),
        role: Set(role),
        organization_id: Set(organization_id),
        truck_id: Set(truck_id),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await?;
    Ok(token.key)
}

/// Checks credentials and opens a session.
///
/// Returns [`Error::InvalidCredentials`] when no store accepts them.
#[instrument(skip(db, config, password))]
pub async fn login(
    db: &DatabaseConnection,
    config: &AuthConfig,
    login: &str,
    password: &str,
) -> Result<LoginResponse> {
    let txn = db.begin().await?;

    if let Some(org) = Organization::find()
        .filter(OrganizationColumn::Login.eq(login))
        .one(&txn)
        .await?
    {
        if verify_password(password, &org.password_hash) {
            let user = shadow_user(&txn, &org.login, false).await?;
            let token = issue_token(&txn, config, user.id, Role::Organization, Some(org.id), None).await?;
            let view = organization::view(&txn, org).await?;
            txn.commit().await?;
            info!(organization = %view.item.name, "Organization logged in");
            return Ok(LoginResponse {
                success: true,
                token,
                user: LoginUser {
                    id: view.item.id.to_string(),
                    name: view.item.name.clone(),
                    role: Role::Organization,
                    enabled_modules: view.item.enabled_modules.0.clone(),
                },
                organization: Some(view),
            });
        }
        debug!("Organization password mismatch, trying other stores");
    }

    if let Some(truck) = Truck::find()
        .filter(TruckColumn::Login.eq(login))
        .one(&txn)
        .await?
    {
        if verify_password(password, &truck.password_hash) {
            let user = shadow_user(&txn, &truck.login, false).await?;
            let token = issue_token(
                &txn,
                config,
                user.id,
                Role::Driver,
                Some(truck.organization_id),
                Some(truck.id),
            )
            .await?;
            txn.commit().await?;
            info!(plate = %truck.plate_number, "Driver logged in");
            return Ok(LoginResponse {
                success: true,
                token,
                user: LoginUser {
                    id: truck.id.to_string(),
                    name: truck.driver_name,
                    role: Role::Driver,
                    enabled_modules: vec![Module::Waste],
                },
                organization: None,
            });
        }
    }

    if let Some((bypass_login, bypass_password)) = config.superadmin() {
        if login == bypass_login && password == bypass_password {
            let user = shadow_user(&txn, bypass_login, true).await?;
            let token = issue_token(&txn, config, user.id, Role::Superadmin, None, None).await?;
            txn.commit().await?;
            warn!("Superadmin logged in with configured bypass credentials");
            return Ok(LoginResponse {
                success: true,
                token,
                user: LoginUser {
                    id: user.id.to_string(),
                    name: "Super Admin".to_string(),
                    role: Role::Superadmin,
                    enabled_modules: Module::all(),
                },
                organization: None,
            });
        }
    }

    if let Some(user) = User::find()
        .filter(UserColumn::Username.eq(login))
        .one(&txn)
        .await?
    {
        if user
            .password_hash
            .as_deref()
            .is_some_and(|hash| verify_password(password, hash))
        {
            let role = if user.is_superuser {
                Role::Superadmin
            } else {
                Role::Admin
            };
            let token = issue_token(&txn, config, user.id, role, None, None).await?;
            txn.commit().await?;
            info!(user = %user.username, ?role, "User logged in");
            return Ok(LoginResponse {
                success: true,
                token,
                user: LoginUser {
                    id: user.id.to_string(),
                    name: user.username,
                    role,
                    enabled_modules: Module::all(),
                },
                organization: None,
            });
        }
    }

    debug!("No credential store accepted the login");
    Err(Error::InvalidCredentials)
}

/// Resolves a token key into a live session.
///
/// Expired tokens are deleted and rejected like unknown ones.
pub async fn authenticate(db: &DatabaseConnection, config: &AuthConfig, key: &str) -> Result<Session> {
    let token = AuthToken::find_by_id(key.to_string())
        .one(db)
        .await?
        .ok_or(Error::Unauthorized)?;

    if token.created_at + config.token_ttl() <= Utc::now() {
        debug!(user_id = %token.user_id, "Token expired");
        AuthToken::delete_by_id(token.key).exec(db).await?;
        return Err(Error::Unauthorized);
    }

    Ok(token.into())
}

/// Ends a session.
pub async fn logout(db: &DatabaseConnection, session: &Session) -> Result<()> {
    AuthToken::delete_by_id(session.token.clone()).exec(db).await?;
    info!(user_id = %session.user_id, "Logged out");
    Ok(())
}

/// Ends every session opened with `login` and drops its shadow user.
///
/// Called when an organization or truck login stops pointing at the same
/// principal (deleted, renamed or moved to another tenant), so a later
/// login with the same name starts from a fresh user and token.
pub async fn revoke_login<C: ConnectionTrait>(db: &C, login: &str) -> Result<()> {
    let Some(shadow) = User::find()
        .filter(UserColumn::Username.eq(login))
        .filter(UserColumn::PasswordHash.is_null())
        .one(db)
        .await?
    else {
        return Ok(());
    };
    AuthToken::delete_many()
        .filter(AuthTokenColumn::UserId.eq(shadow.id))
        .exec(db)
        .await?;
    User::delete_by_id(shadow.id).exec(db).await?;
    debug!(%login, "Revoked sessions of login");
    Ok(())
}

/// Creates an administrative user unless the username is taken.
///
/// Returns the user and whether it was created.
pub async fn create_admin(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    is_superuser: bool,
) -> Result<(UserModel, bool)> {
    if username.trim().is_empty() {
        return Err(Error::field("username", super::validation::BLANK));
    }
    if password.is_empty() {
        return Err(Error::field("password", super::validation::BLANK));
    }
    if let Some(existing) = User::find()
        .filter(UserColumn::Username.eq(username))
        .one(db)
        .await?
    {
        warn!(%username, "User already exists");
        return Ok((existing, false));
    }

    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        password_hash: Set(Some(hash_password(password)?)),
        is_superuser: Set(is_superuser),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await?;
    info!(%username, is_superuser, "Created user");
    Ok((user, true))
}

/// Checks that a login is not used by another organization, truck or admin user.
pub async fn ensure_login_available<C: ConnectionTrait>(
    db: &C,
    field: &str,
    login: &str,
    except_organization: Option<Uuid>,
    except_truck: Option<Uuid>,
) -> Result<()> {
    let taken = "Login already in use.";

    let mut orgs = Organization::find().filter(OrganizationColumn::Login.eq(login));
    if let Some(id) = except_organization {
        orgs = orgs.filter(OrganizationColumn::Id.ne(id));
    }
    if orgs.one(db).await?.is_some() {
        return Err(Error::field(field, taken));
    }

    let mut trucks = Truck::find().filter(TruckColumn::Login.eq(login));
    if let Some(id) = except_truck {
        trucks = trucks.filter(TruckColumn::Id.ne(id));
    }
    if trucks.one(db).await?.is_some() {
        return Err(Error::field(field, taken));
    }

    let admin = User::find()
        .filter(UserColumn::Username.eq(login))
        .filter(UserColumn::PasswordHash.is_not_null())
        .one(db)
        .await?;
    if admin.is_some() {
        return Err(Error::field(field, taken));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn config() -> AuthConfig {
        AuthConfig {
            superadmin_login: Some("superadmin".into()),
            superadmin_password: Some("123".into()),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("123", &hash));
        assert!(!verify_password("1234", &hash));
        assert!(!verify_password("123", "plaintext"));
    }

    #[test]
    fn test_token_keys_are_40_hex_chars() {
        let key = generate_token_key();
        assert_eq!(key.len(), 40);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_token_key());
    }

    #[tokio::test]
    async fn test_organization_login() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;

        let response = login(&db, &config(), "fergana_admin", TEST_PASSWORD).await?;
        assert!(response.success);
        assert_eq!(response.user.role, Role::Organization);
        assert_eq!(response.user.id, org.item.id.to_string());
        assert_eq!(response.organization.unwrap().item.id, org.item.id);

        let session = authenticate(&db, &config(), &response.token).await?;
        assert_eq!(session.scope(), Scope::Organization(org.item.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_repeat_login_reuses_token() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_organization(&db, "fergana_admin").await?;

        let first = login(&db, &config(), "fergana_admin", TEST_PASSWORD).await?;
        let second = login(&db, &config(), "fergana_admin", TEST_PASSWORD).await?;
        assert_eq!(first.token, second.token);
        Ok(())
    }

    #[tokio::test]
    async fn test_driver_login_is_scoped_to_truck_organization() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        let truck = create_test_truck(&db, org.item.id, "driver_fa_777").await?;

        let response = login(&db, &config(), "driver_fa_777", TEST_PASSWORD).await?;
        assert_eq!(response.user.role, Role::Driver);
        assert_eq!(response.user.enabled_modules, vec![Module::Waste]);
        assert!(response.organization.is_none());

        let session = authenticate(&db, &config(), &response.token).await?;
        assert_eq!(session.truck_id, Some(truck.item.id));
        assert_eq!(session.scope(), Scope::Organization(org.item.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_superadmin_bypass_and_admin_users() -> Result<()> {
        let db = setup_test_db().await?;

        let bypass = login(&db, &config(), "superadmin", "123").await?;
        assert_eq!(bypass.user.role, Role::Superadmin);
        assert_eq!(bypass.user.enabled_modules.len(), 12);

        // Without configured bypass credentials the same login fails
        let result = login(&db, &AuthConfig::default(), "superadmin", "123").await;
        assert!(matches!(result, Err(Error::InvalidCredentials)));

        let (_, created) = create_admin(&db, "admin", "secret", false).await?;
        assert!(created);
        let (_, created) = create_admin(&db, "admin", "other", false).await?;
        assert!(!created);

        let admin = login(&db, &config(), "admin", "secret").await?;
        assert_eq!(admin.user.role, Role::Admin);
        let session = authenticate(&db, &config(), &admin.token).await?;
        assert_eq!(session.scope(), Scope::All);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_credentials() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_organization(&db, "fergana_admin").await?;

        let result = login(&db, &config(), "fergana_admin", "wrong").await;
        assert!(matches!(result, Err(Error::InvalidCredentials)));
        let result = login(&db, &config(), "nobody", "123").await;
        assert!(matches!(result, Err(Error::InvalidCredentials)));
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected_and_deleted() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_organization(&db, "fergana_admin").await?;
        let response = login(&db, &config(), "fergana_admin", TEST_PASSWORD).await?;

        let expired = AuthConfig {
            token_ttl_hours: 0,
            ..config()
        };
        let result = authenticate(&db, &expired, &response.token).await;
        assert!(matches!(result, Err(Error::Unauthorized)));
        assert!(
            AuthToken::find_by_id(response.token.clone())
                .one(&db)
                .await?
                .is_none()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_organization(&db, "fergana_admin").await?;
        let response = login(&db, &config(), "fergana_admin", TEST_PASSWORD).await?;
        let session = authenticate(&db, &config(), &response.token).await?;

        logout(&db, &session).await?;
        let result = authenticate(&db, &config(), &response.token).await;
        assert!(matches!(result, Err(Error::Unauthorized)));
        Ok(())
    }

    #[tokio::test]
    async fn test_login_must_be_unique_across_stores() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        create_test_truck(&db, org.item.id, "driver_1").await?;
        create_admin(&db, "admin", "secret", true).await?;

        for taken in ["fergana_admin", "driver_1", "admin"] {
            let result = ensure_login_available(&db, "login", taken, None, None).await;
            assert!(matches!(result, Err(Error::Validation(_))), "{taken}");
        }
        ensure_login_available(&db, "login", "fergana_admin", Some(org.item.id), None).await?;
        ensure_login_available(&db, "login", "fresh_login", None, None).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_truck_session_does_not_follow_reused_login() -> Result<()> {
        use crate::core::resource::Resource;
        use crate::core::waste::Trucks;

        let db = setup_test_db().await?;
        let org_a = create_test_organization(&db, "org_a").await?;
        let org_b = create_test_organization(&db, "org_b").await?;
        let truck = create_test_truck(&db, org_a.item.id, "drv").await?;
        let old = login(&db, &config(), "drv", TEST_PASSWORD).await?;

        Trucks::delete(&db, Scope::All, truck.item.id).await?;
        let result = authenticate(&db, &config(), &old.token).await;
        assert!(matches!(result, Err(Error::Unauthorized)));

        let replacement = create_test_truck(&db, org_b.item.id, "drv").await?;
        let new = login(&db, &config(), "drv", TEST_PASSWORD).await?;
        assert_ne!(new.token, old.token);
        let session = authenticate(&db, &config(), &new.token).await?;
        assert_eq!(session.truck_id, Some(replacement.item.id));
        assert_eq!(session.scope(), Scope::Organization(org_b.item.id));
        assert!(matches!(
            authenticate(&db, &config(), &old.token).await,
            Err(Error::Unauthorized)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_moving_truck_or_renaming_login_ends_sessions() -> Result<()> {
        use crate::core::organization::{OrganizationInput, Organizations};
        use crate::core::resource::Resource;
        use crate::core::validation::WriteMode;
        use crate::core::waste::{TruckInput, Trucks};

        let db = setup_test_db().await?;
        let org_a = create_test_organization(&db, "org_a").await?;
        let org_b = create_test_organization(&db, "org_b").await?;
        let truck = create_test_truck(&db, org_a.item.id, "drv").await?;

        let driver = login(&db, &config(), "drv", TEST_PASSWORD).await?;
        let moved = TruckInput {
            organization: Some(org_b.item.id),
            ..TruckInput::default()
        };
        Trucks::update(&db, Scope::All, truck.item.id, moved, WriteMode::Patch).await?;
        assert!(matches!(
            authenticate(&db, &config(), &driver.token).await,
            Err(Error::Unauthorized)
        ));
        let driver = login(&db, &config(), "drv", TEST_PASSWORD).await?;
        let session = authenticate(&db, &config(), &driver.token).await?;
        assert_eq!(session.scope(), Scope::Organization(org_b.item.id));

        let tenant = login(&db, &config(), "org_a", TEST_PASSWORD).await?;
        let renamed = OrganizationInput {
            login: Some("org_a_renamed".to_string()),
            ..OrganizationInput::default()
        };
        Organizations::update(&db, Scope::All, org_a.item.id, renamed, WriteMode::Patch).await?;
        assert!(matches!(
            authenticate(&db, &config(), &tenant.token).await,
            Err(Error::Unauthorized)
        ));
        Ok(())
    }
}

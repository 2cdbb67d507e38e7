//! Organization business logic - the tenants.
//!
//! Organizations are addressed by id or by login. A tenant session only ever
//! sees and edits its own organization; creating and deleting organizations
//! needs an unrestricted session. Deleting an organization removes every row
//! it owns together with those rows' coordinates and device-health records.

use super::auth::{ensure_login_available, hash_password, revoke_login};
use super::geo::{self, Point, check_point};
use super::resource::Resource;
use super::tenant::Scope;
use super::validation::{Checker, REQUIRED, WriteMode, assign, missing_reference};
use super::device_health;
use crate::entities::organization::OrganizationType;
use crate::entities::types::{Module, ModuleList};
use crate::entities::{
    AirSensor, AirSensorColumn, AuthToken, AuthTokenColumn, Bus, BusColumn, CallRequest,
    CallRequestColumn, ConstructionSite, CoordinateModel, EcoViolation, EcoViolationColumn,
    LightPole, LightPoleColumn, Organization, OrganizationColumn, OrganizationModel, SiteColumn,
    SosColumn, SosColumnColumn, Truck, TruckColumn, User, UserColumn, UtilityNode,
    UtilityNodeColumn, WasteBin, WasteBinColumn, organization,
};
use crate::errors::{Error, Result};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Organization read representation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationView {
    /// The organization row
    #[serde(flatten)]
    pub item: OrganizationModel,
    /// Owned center point
    pub center: Option<CoordinateModel>,
    /// Region id, duplicated under the name clients look for
    #[serde(rename = "regionId")]
    pub region_ref: Uuid,
    /// District id, duplicated under the name clients look for
    #[serde(rename = "districtId")]
    pub district_ref: Uuid,
}

/// Organization write payload
///
/// `region` and `district` accept an id or an exact name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrganizationInput {
    /// Display name
    pub name: Option<String>,
    /// Organization kind
    #[serde(rename = "type")]
    pub kind: Option<OrganizationType>,
    /// Unique login
    pub login: Option<String>,
    /// New password, stored hashed
    pub password: Option<String>,
    /// Region id or name
    #[serde(alias = "regionId")]
    pub region: Option<String>,
    /// District id or name
    #[serde(alias = "districtId")]
    pub district: Option<String>,
    /// Map center
    pub center: Option<Point>,
    /// Feature modules
    pub enabled_modules: Option<Vec<Module>>,
}

impl OrganizationInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("name", self.name.as_ref());
        checker.required("type", self.kind.as_ref());
        checker.text("login", self.login.as_ref());
        checker.required("region", self.region.as_ref());
        checker.required("district", self.district.as_ref());
        check_point(&mut checker, "center", self.center.as_ref());
        if mode == WriteMode::Create {
            checker.text("password", self.password.as_ref());
        } else {
            checker.not_blank("password", self.password.as_ref());
        }
        checker.finish()
    }
}

/// Builds the read representation of an organization.
pub async fn view<C: ConnectionTrait>(db: &C, org: OrganizationModel) -> Result<OrganizationView> {
    let center = geo::find_coordinate(db, org.center_id).await?;
    Ok(OrganizationView {
        region_ref: org.region_id,
        district_ref: org.district_id,
        center,
        item: org,
    })
}

/// Finds an organization by id or, failing that, by login.
pub async fn find_by_key<C: ConnectionTrait>(db: &C, key: &str) -> Result<Option<OrganizationModel>> {
    if let Ok(id) = Uuid::parse_str(key) {
        if let Some(org) = Organization::find_by_id(id).one(db).await? {
            return Ok(Some(org));
        }
    }
    Organization::find()
        .filter(OrganizationColumn::Login.eq(key))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn ensure_exists<C: ConnectionTrait>(db: &C, id: Option<Uuid>) -> Result<Option<Uuid>> {
    if let Some(id) = id {
        if Organization::find_by_id(id).one(db).await?.is_none() {
            return Err(missing_reference("organization", id));
        }
    }
    Ok(id)
}

/// Owner of a new tenant-owned row: the caller's organization, or the
/// requested (and existing) one for an unrestricted caller.
pub async fn owner_for_create<C: ConnectionTrait>(
    db: &C,
    scope: Scope,
    requested: Option<Uuid>,
) -> Result<Option<Uuid>> {
    match scope {
        Scope::All => ensure_exists(db, requested).await,
        Scope::Organization(_) => Ok(scope.owner_for_create(requested)),
    }
}

/// Owner of a tenant-owned row after an update, see [`Scope::owner_for_update`].
pub async fn owner_for_update<C: ConnectionTrait>(
    db: &C,
    scope: Scope,
    current: Option<Uuid>,
    requested: Option<Uuid>,
) -> Result<Option<Uuid>> {
    let owner = scope.owner_for_update(current, requested);
    if owner != current {
        ensure_exists(db, owner).await?;
    }
    Ok(owner)
}

async fn resolve_hierarchy<C: ConnectionTrait>(
    db: &C,
    input: &OrganizationInput,
) -> Result<(Option<Uuid>, Option<Uuid>)> {
    let region = match input.region.as_deref() {
        Some(key) => Some(
            geo::resolve_region(db, key)
                .await?
                .ok_or_else(|| Error::field("regionId", "Region does not exist"))?
                .id,
        ),
        None => None,
    };
    let district = match input.district.as_deref() {
        Some(key) => Some(
            geo::resolve_district(db, key)
                .await?
                .ok_or_else(|| Error::field("districtId", "District does not exist"))?
                .id,
        ),
        None => None,
    };
    Ok((region, district))
}

async fn insert<C: ConnectionTrait>(db: &C, input: OrganizationInput) -> Result<OrganizationView> {
    let (region_id, district_id) = resolve_hierarchy(db, &input).await?;
    let (Some(name), Some(kind), Some(login), Some(password), Some(region_id), Some(district_id), Some(center)) = (
        input.name,
        input.kind,
        input.login,
        input.password,
        region_id,
        district_id,
        input.center,
    ) else {
        return Err(Error::field("name", REQUIRED));
    };
    let login = login.trim().to_string();
    ensure_login_available(db, "login", &login, None, None).await?;

    let center = geo::insert_coordinate(db, center).await?;
    let org = organization::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.trim().to_string()),
        kind: Set(kind),
        login: Set(login),
        password_hash: Set(hash_password(&password)?),
        region_id: Set(region_id),
        district_id: Set(district_id),
        center_id: Set(center.id),
        enabled_modules: Set(ModuleList(input.enabled_modules.unwrap_or_default())),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await?;
    info!(organization = %org.name, login = %org.login, "Created organization");
    Ok(OrganizationView {
        region_ref: org.region_id,
        district_ref: org.district_id,
        center: Some(center),
        item: org,
    })
}

async fn apply<C: ConnectionTrait>(
    db: &C,
    existing: OrganizationModel,
    input: OrganizationInput,
) -> Result<OrganizationView> {
    let (region_id, district_id) = resolve_hierarchy(db, &input).await?;
    if let Some(login) = input.login.as_deref() {
        ensure_login_available(db, "login", login.trim(), Some(existing.id), None).await?;
        if login.trim() != existing.login {
            revoke_login(db, &existing.login).await?;
        }
    }
    if let Some(center) = input.center {
        geo::move_coordinate(db, existing.center_id, center).await?;
    }
    let mut active: organization::ActiveModel = existing.into();
    assign(&mut active.name, input.name.map(|n| n.trim().to_string()));
    assign(&mut active.kind, input.kind);
    assign(&mut active.login, input.login.map(|l| l.trim().to_string()));
    if let Some(password) = input.password {
        active.password_hash = Set(hash_password(&password)?);
    }
    assign(&mut active.region_id, region_id);
    assign(&mut active.district_id, district_id);
    assign(&mut active.enabled_modules, input.enabled_modules.map(ModuleList));
    let org = active.update(db).await?;
    view(db, org).await
}

/// Organization resource
pub struct Organizations;

impl Resource for Organizations {
    const NAME: &'static str = "organizations";
    type Input = OrganizationInput;
    type View = OrganizationView;

    async fn list(db: &DatabaseConnection, scope: Scope) -> Result<Vec<OrganizationView>> {
        let orgs = Organization::find()
            .filter(scope.condition(OrganizationColumn::Id))
            .order_by_asc(OrganizationColumn::Name)
            .all(db)
            .await?;
        let centers = geo::coordinate_map(db, orgs.iter().map(|o| o.center_id)).await?;
        Ok(orgs
            .into_iter()
            .map(|org| OrganizationView {
                region_ref: org.region_id,
                district_ref: org.district_id,
                center: centers.get(&org.center_id).cloned(),
                item: org,
            })
            .collect())
    }

    async fn retrieve(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<OrganizationView> {
        retrieve_by_key(db, scope, &id.to_string()).await
    }

    async fn create(
        db: &DatabaseConnection,
        scope: Scope,
        input: OrganizationInput,
    ) -> Result<OrganizationView> {
        scope.ensure_unrestricted()?;
        input.validate(WriteMode::Create)?;
        let txn = db.begin().await?;
        let view = insert(&txn, input).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn update(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
        input: OrganizationInput,
        mode: WriteMode,
    ) -> Result<OrganizationView> {
        update_by_key(db, scope, &id.to_string(), input, mode).await
    }

    async fn delete(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<()> {
        delete_by_key(db, scope, &id.to_string()).await
    }
}

/// Retrieves an organization by id or login.
pub async fn retrieve_by_key(db: &DatabaseConnection, scope: Scope, key: &str) -> Result<OrganizationView> {
    let org = find_by_key(db, key)
        .await?
        .ok_or_else(|| Error::not_found("Organization", key))?;
    scope.ensure(Some(org.id))?;
    view(db, org).await
}

/// Updates an organization by id or login.
///
/// A full replace (`PUT`) addressed to an unknown login creates the
/// organization with that login.
#[instrument(skip(db, input))]
pub async fn update_by_key(
    db: &DatabaseConnection,
    scope: Scope,
    key: &str,
    mut input: OrganizationInput,
    mode: WriteMode,
) -> Result<OrganizationView> {
    let txn = db.begin().await?;
    let Some(existing) = find_by_key(&txn, key).await? else {
        if mode != WriteMode::Replace || Uuid::parse_str(key).is_ok() {
            return Err(Error::not_found("Organization", key));
        }
        scope.ensure_unrestricted()?;
        input.login = Some(key.to_string());
        input.validate(WriteMode::Create)?;
        let view = insert(&txn, input).await?;
        txn.commit().await?;
        return Ok(view);
    };
    scope.ensure(Some(existing.id))?;
    input.validate(mode)?;
    let view = apply(&txn, existing, input).await?;
    txn.commit().await?;
    Ok(view)
}

/// Deletes an organization (by id or login) and everything it owns.
pub async fn delete_by_key(db: &DatabaseConnection, scope: Scope, key: &str) -> Result<()> {
    scope.ensure_unrestricted()?;
    let txn = db.begin().await?;
    let org = find_by_key(&txn, key)
        .await?
        .ok_or_else(|| Error::not_found("Organization", key))?;
    purge(&txn, &org).await?;
    txn.commit().await?;
    info!(organization = %org.name, "Deleted organization");
    Ok(())
}

/// Removes an organization and every row it owns.
///
/// Owned coordinates and device-health rows go with their parents, call
/// requests assigned to it become unassigned, and sessions bound to it end.
pub async fn purge<C: ConnectionTrait>(db: &C, org: &OrganizationModel) -> Result<()> {
    let id = org.id;
    let mut coordinates = vec![org.center_id];
    let mut health = Vec::new();
    let mut logins = vec![org.login.clone()];

    let bins = WasteBin::find()
        .filter(WasteBinColumn::OrganizationId.eq(id))
        .all(db)
        .await?;
    coordinates.extend(bins.iter().map(|b| b.location_id));
    WasteBin::delete_many()
        .filter(WasteBinColumn::OrganizationId.eq(id))
        .exec(db)
        .await?;

    let trucks = Truck::find()
        .filter(TruckColumn::OrganizationId.eq(id))
        .all(db)
        .await?;
    coordinates.extend(trucks.iter().map(|t| t.location_id));
    logins.extend(trucks.iter().map(|t| t.login.clone()));
    Truck::delete_many()
        .filter(TruckColumn::OrganizationId.eq(id))
        .exec(db)
        .await?;

    let sensors = AirSensor::find()
        .filter(AirSensorColumn::OrganizationId.eq(id))
        .all(db)
        .await?;
    coordinates.extend(sensors.iter().map(|s| s.location_id));
    AirSensor::delete_many()
        .filter(AirSensorColumn::OrganizationId.eq(id))
        .exec(db)
        .await?;

    let columns = SosColumn::find()
        .filter(SosColumnColumn::OrganizationId.eq(id))
        .all(db)
        .await?;
    coordinates.extend(columns.iter().map(|c| c.location_id));
    health.extend(columns.iter().map(|c| c.device_health_id));
    SosColumn::delete_many()
        .filter(SosColumnColumn::OrganizationId.eq(id))
        .exec(db)
        .await?;

    let poles = LightPole::find()
        .filter(LightPoleColumn::OrganizationId.eq(id))
        .all(db)
        .await?;
    coordinates.extend(poles.iter().map(|p| p.location_id));
    LightPole::delete_many()
        .filter(LightPoleColumn::OrganizationId.eq(id))
        .exec(db)
        .await?;

    let buses = Bus::find().filter(BusColumn::OrganizationId.eq(id)).all(db).await?;
    coordinates.extend(buses.iter().map(|b| b.location_id));
    Bus::delete_many()
        .filter(BusColumn::OrganizationId.eq(id))
        .exec(db)
        .await?;

    let nodes = UtilityNode::find()
        .filter(UtilityNodeColumn::OrganizationId.eq(id))
        .all(db)
        .await?;
    coordinates.extend(nodes.iter().map(|n| n.location_id));
    UtilityNode::delete_many()
        .filter(UtilityNodeColumn::OrganizationId.eq(id))
        .exec(db)
        .await?;

    EcoViolation::delete_many()
        .filter(EcoViolationColumn::OrganizationId.eq(id))
        .exec(db)
        .await?;
    ConstructionSite::delete_many()
        .filter(SiteColumn::OrganizationId.eq(id))
        .exec(db)
        .await?;

    CallRequest::update_many()
        .col_expr(CallRequestColumn::AssignedOrgId, Expr::value(Option::<Uuid>::None))
        .filter(CallRequestColumn::AssignedOrgId.eq(id))
        .exec(db)
        .await?;

    AuthToken::delete_many()
        .filter(AuthTokenColumn::OrganizationId.eq(id))
        .exec(db)
        .await?;
    User::delete_many()
        .filter(UserColumn::Username.is_in(logins))
        .filter(UserColumn::PasswordHash.is_null())
        .exec(db)
        .await?;

    Organization::delete_by_id(id).exec(db).await?;
    geo::delete_coordinates(db, coordinates).await?;
    device_health::delete(db, health).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::auth::verify_password;
    use crate::core::waste::WasteBins;
    use crate::entities::{Coordinate, Room};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_hashes_password_and_resolves_names() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "margilon_admin").await?;

        assert_eq!(org.item.login, "margilon_admin");
        assert!(verify_password(TEST_PASSWORD, &org.item.password_hash));
        assert_eq!(org.region_ref, org.item.region_id);
        assert!(org.center.is_some());

        let json = serde_json::to_value(&org).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["type"], "HOKIMIYAT");
        assert_eq!(json["regionId"], org.item.region_id.to_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_region_name_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let mut input = test_organization_input(&db, "x_admin").await?;
        input.region = Some("Atlantis".into());

        let result = Organizations::create(&db, Scope::All, input).await;
        let Err(Error::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.contains("regionId"));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_login_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_organization(&db, "fergana_admin").await?;
        let input = test_organization_input(&db, "fergana_admin").await?;

        let result = Organizations::create(&db, Scope::All, input).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_tenant_sees_only_itself() -> Result<()> {
        let db = setup_test_db().await?;
        let mine = create_test_organization(&db, "fergana_admin").await?;
        let theirs = create_test_organization(&db, "kokand_admin").await?;
        let scope = Scope::Organization(mine.item.id);

        let listed = Organizations::list(&db, scope).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].item.id, mine.item.id);
        assert_eq!(Organizations::list(&db, Scope::All).await?.len(), 2);

        let by_login = retrieve_by_key(&db, scope, "fergana_admin").await?;
        assert_eq!(by_login.item.id, mine.item.id);
        let result = retrieve_by_key(&db, scope, &theirs.item.id.to_string()).await;
        assert!(matches!(result, Err(Error::Forbidden)));
        Ok(())
    }

    #[tokio::test]
    async fn test_put_unknown_login_creates() -> Result<()> {
        let db = setup_test_db().await?;
        let mut input = test_organization_input(&db, "ignored").await?;
        input.login = None;

        let created = update_by_key(&db, Scope::All, "andijan_admin", input.clone(), WriteMode::Replace).await?;
        assert_eq!(created.item.login, "andijan_admin");

        let result = update_by_key(&db, Scope::All, "nobody", input, WriteMode::Patch).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_patch_changes_modules_and_password() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;

        let updated = update_by_key(
            &db,
            Scope::Organization(org.item.id),
            "fergana_admin",
            OrganizationInput {
                password: Some("new-password".into()),
                enabled_modules: Some(vec![Module::Dashboard, Module::Air]),
                ..Default::default()
            },
            WriteMode::Patch,
        )
        .await?;

        assert_eq!(updated.item.enabled_modules.0, vec![Module::Dashboard, Module::Air]);
        assert!(verify_password("new-password", &updated.item.password_hash));
        assert_eq!(updated.item.name, org.item.name);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_purges_owned_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        let bin = create_test_waste_bin(&db, org.item.id, "Mustaqillik 15").await?;
        let room = create_test_room(&db, "Xona 101").await?;

        let result = delete_by_key(&db, Scope::Organization(org.item.id), "fergana_admin").await;
        assert!(matches!(result, Err(Error::Forbidden)));

        delete_by_key(&db, Scope::All, "fergana_admin").await?;

        assert!(Organization::find_by_id(org.item.id).one(&db).await?.is_none());
        let bins = WasteBins::list(&db, Scope::All).await?;
        assert!(bins.is_empty());
        let location = bin.location.unwrap();
        assert!(Coordinate::find_by_id(location.id).one(&db).await?.is_none());
        // Shared reference data is untouched
        assert!(Room::find_by_id(room.id).one(&db).await?.is_some());
        Ok(())
    }
}

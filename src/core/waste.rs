//! Waste collection - bins and the trucks that empty them.
//!
//! Both are tenant-owned: every bin and truck belongs to exactly one
//! organization. Trucks double as driver accounts, so a truck carries a login
//! and an argon2 password hash.

use super::auth::{ensure_login_available, hash_password, revoke_login};
use super::geo::{self, Located, Point, check_point};
use super::organization;
use super::resource::Resource;
use super::tenant::Scope;
use super::validation::{Checker, REQUIRED, WriteMode, assign, assign_opt};
use crate::entities::truck::TruckStatus;
use crate::entities::waste_bin::ImageSource;
use crate::entities::{
    AuthToken, AuthTokenColumn, Truck, TruckColumn, TruckModel, WasteBin, WasteBinColumn,
    WasteBinModel, truck, waste_bin,
};
use crate::errors::{Error, Result};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Cleaning zone given to bins and trucks created without one
pub const DEFAULT_HUDUD: &str = "1-sonli Toza Hudud";

/// Fill level above which a bin counts as full
pub const FULL_THRESHOLD: i32 = 80;

/// Whether a fill level means the bin needs collecting.
#[must_use]
pub const fn is_full(fill_level: i32) -> bool {
    fill_level > FULL_THRESHOLD
}

/// Waste bin write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WasteBinInput {
    /// Owner, only honoured for unrestricted callers
    pub organization: Option<Uuid>,
    /// Street address
    pub address: Option<String>,
    /// Position as `{lat, lng}`
    pub location: Option<Point>,
    /// Cleaning zone
    pub toza_hudud: Option<String>,
    /// Camera stream URL
    pub camera_url: Option<String>,
    /// Google Maps link
    pub google_maps_url: Option<String>,
    /// Fill percentage
    pub fill_level: Option<i32>,
    /// Expected fill growth per hour
    pub fill_rate: Option<f64>,
    /// Summary of the last image analysis
    pub last_analysis: Option<String>,
    /// Image URL
    pub image_url: Option<String>,
    /// Where the image came from
    pub image_source: Option<ImageSource>,
    /// Explicit flag; derived from `fill_level` when absent
    pub is_full: Option<bool>,
    /// Free-form sensor health object
    pub device_health: Option<Value>,
}

impl WasteBinInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("address", self.address.as_ref());
        check_point(&mut checker, "location", self.location.as_ref());
        checker.not_blank("toza_hudud", self.toza_hudud.as_ref());
        checker.int_range("fill_level", self.fill_level, 0, 100);
        checker.finite("fill_rate", self.fill_rate);
        if self.device_health.as_ref().is_some_and(|v| !v.is_object()) {
            checker.add("device_health", "Expected a JSON object.");
        }
        checker.finish()
    }
}

/// Waste bin resource
pub struct WasteBins;

async fn find_bin<C: ConnectionTrait>(db: &C, scope: Scope, id: Uuid) -> Result<WasteBinModel> {
    let bin = WasteBin::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("WasteBin", id))?;
    scope.ensure(Some(bin.organization_id))?;
    Ok(bin)
}

impl Resource for WasteBins {
    const NAME: &'static str = "waste-bins";
    type Input = WasteBinInput;
    type View = Located<WasteBinModel>;

    async fn list(db: &DatabaseConnection, scope: Scope) -> Result<Vec<Self::View>> {
        let bins = WasteBin::find()
            .filter(scope.condition(WasteBinColumn::OrganizationId))
            .order_by_asc(WasteBinColumn::Address)
            .all(db)
            .await?;
        geo::attach_locations(db, bins, |b| b.location_id).await
    }

    async fn retrieve(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<Self::View> {
        let bin = find_bin(db, scope, id).await?;
        let location_id = bin.location_id;
        geo::attach_location(db, bin, location_id).await
    }

    #[instrument(skip(db, input))]
    async fn create(db: &DatabaseConnection, scope: Scope, input: WasteBinInput) -> Result<Self::View> {
        input.validate(WriteMode::Create)?;
        let txn = db.begin().await?;
        let Some(owner) = organization::owner_for_create(&txn, scope, input.organization).await? else {
            return Err(Error::field("organization", REQUIRED));
        };
        let (Some(address), Some(location)) = (input.address, input.location) else {
            return Err(Error::field("address", REQUIRED));
        };
        let location = geo::insert_coordinate(&txn, location).await?;
        let fill_level = input.fill_level.unwrap_or(0);
        let bin = waste_bin::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(owner),
            address: Set(address.trim().to_string()),
            location_id: Set(location.id),
            toza_hudud: Set(input.toza_hudud.unwrap_or_else(|| DEFAULT_HUDUD.to_string())),
            camera_url: Set(input.camera_url),
            google_maps_url: Set(input.google_maps_url),
            fill_level: Set(fill_level),
            fill_rate: Set(input.fill_rate.unwrap_or(1.5)),
            last_analysis: Set(input
                .last_analysis
                .unwrap_or_else(|| "Yangi qo'shildi".to_string())),
            image_url: Set(input.image_url),
            image_source: Set(input.image_source.unwrap_or_default()),
            is_full: Set(input.is_full.unwrap_or(is_full(fill_level))),
            device_health: Set(input
                .device_health
                .unwrap_or_else(|| Value::Object(serde_json::Map::new()))),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        info!(address = %bin.address, organization = %bin.organization_id, "Created waste bin");
        Ok(Located {
            item: bin,
            location: Some(location),
        })
    }

    async fn update(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
        input: WasteBinInput,
        mode: WriteMode,
    ) -> Result<Self::View> {
        input.validate(mode)?;
        let txn = db.begin().await?;
        let existing = find_bin(&txn, scope, id).await?;
        let owner = organization::owner_for_update(
            &txn,
            scope,
            Some(existing.organization_id),
            input.organization,
        )
        .await?;
        if let Some(location) = input.location {
            geo::move_coordinate(&txn, existing.location_id, location).await?;
        }
        let location_id = existing.location_id;
        let mut active: waste_bin::ActiveModel = existing.into();
        assign(&mut active.organization_id, owner);
        assign(&mut active.address, input.address.map(|a| a.trim().to_string()));
        assign(&mut active.toza_hudud, input.toza_hudud);
        assign_opt(&mut active.camera_url, input.camera_url);
        assign_opt(&mut active.google_maps_url, input.google_maps_url);
        assign(&mut active.fill_level, input.fill_level);
        assign(&mut active.fill_rate, input.fill_rate);
        assign(&mut active.last_analysis, input.last_analysis);
        assign_opt(&mut active.image_url, input.image_url);
        assign(&mut active.image_source, input.image_source);
        assign(&mut active.is_full, input.is_full.or(input.fill_level.map(is_full)));
        assign(&mut active.device_health, input.device_health);
        let bin = active.update(&txn).await?;
        let view = geo::attach_location(&txn, bin, location_id).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn delete(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<()> {
        let txn = db.begin().await?;
        let bin = find_bin(&txn, scope, id).await?;
        WasteBin::delete_by_id(bin.id).exec(&txn).await?;
        geo::delete_coordinates(&txn, [bin.location_id]).await?;
        txn.commit().await?;
        info!(address = %bin.address, "Deleted waste bin");
        Ok(())
    }
}

/// Bins of one cleaning zone.
pub async fn bins_by_hudud(
    db: &DatabaseConnection,
    scope: Scope,
    hudud: &str,
) -> Result<Vec<Located<WasteBinModel>>> {
    let bins = WasteBin::find()
        .filter(scope.condition(WasteBinColumn::OrganizationId))
        .filter(WasteBinColumn::TozaHudud.eq(hudud))
        .order_by_asc(WasteBinColumn::Address)
        .all(db)
        .await?;
    geo::attach_locations(db, bins, |b| b.location_id).await
}

/// Image pushed by a camera or the messenger bot
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageUpdate {
    /// Image URL
    pub image_url: Option<String>,
    /// Defaults to [`ImageSource::Bot`]
    pub image_source: Option<ImageSource>,
    /// Level read off the image, if any
    pub fill_level: Option<i32>,
    /// Summary of the last image analysis
    pub last_analysis: Option<String>,
}

/// Records a new image of a bin, optionally with the fill level read off it.
pub async fn update_image(
    db: &DatabaseConnection,
    scope: Scope,
    id: Uuid,
    update: ImageUpdate,
) -> Result<Located<WasteBinModel>> {
    let mut checker = Checker::new(WriteMode::Create);
    checker.text("image_url", update.image_url.as_ref());
    checker.int_range("fill_level", update.fill_level, 0, 100);
    checker.finish()?;

    let bin = find_bin(db, scope, id).await?;
    let location_id = bin.location_id;
    let mut active: waste_bin::ActiveModel = bin.into();
    active.image_url = Set(update.image_url);
    active.image_source = Set(update.image_source.unwrap_or(ImageSource::Bot));
    assign(&mut active.fill_level, update.fill_level);
    assign(&mut active.is_full, update.fill_level.map(is_full));
    assign(&mut active.last_analysis, update.last_analysis);
    let bin = active.update(db).await?;
    debug!(bin = %bin.id, source = ?bin.image_source, "Bin image updated");
    geo::attach_location(db, bin, location_id).await
}

/// Truck write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TruckInput {
    /// Owner, only honoured for unrestricted callers
    pub organization: Option<Uuid>,
    /// Driver full name
    pub driver_name: Option<String>,
    /// Licence plate
    pub plate_number: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Cleaning zone
    pub toza_hudud: Option<String>,
    /// Position as `{lat, lng}`
    pub location: Option<Point>,
    /// Current status
    pub status: Option<TruckStatus>,
    /// Fuel percentage
    pub fuel_level: Option<i32>,
    /// Driver login
    pub login: Option<String>,
    /// Driver password, stored hashed
    pub password: Option<String>,
}

impl TruckInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("driver_name", self.driver_name.as_ref());
        checker.text("plate_number", self.plate_number.as_ref());
        checker.text("phone", self.phone.as_ref());
        checker.not_blank("toza_hudud", self.toza_hudud.as_ref());
        check_point(&mut checker, "location", self.location.as_ref());
        checker.int_range("fuel_level", self.fuel_level, 0, 100);
        checker.text("login", self.login.as_ref());
        if mode == WriteMode::Create {
            checker.text("password", self.password.as_ref());
        } else {
            checker.not_blank("password", self.password.as_ref());
        }
        checker.finish()
    }
}

/// Truck resource
pub struct Trucks;

async fn find_truck<C: ConnectionTrait>(db: &C, scope: Scope, id: Uuid) -> Result<TruckModel> {
    let truck = Truck::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Truck", id))?;
    scope.ensure(Some(truck.organization_id))?;
    Ok(truck)
}

impl Resource for Trucks {
    const NAME: &'static str = "trucks";
    type Input = TruckInput;
    type View = Located<TruckModel>;

    async fn list(db: &DatabaseConnection, scope: Scope) -> Result<Vec<Self::View>> {
        let trucks = Truck::find()
            .filter(scope.condition(TruckColumn::OrganizationId))
            .order_by_asc(TruckColumn::PlateNumber)
            .all(db)
            .await?;
        geo::attach_locations(db, trucks, |t| t.location_id).await
    }

    async fn retrieve(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<Self::View> {
        let truck = find_truck(db, scope, id).await?;
        let location_id = truck.location_id;
        geo::attach_location(db, truck, location_id).await
    }

    #[instrument(skip(db, input))]
    async fn create(db: &DatabaseConnection, scope: Scope, input: TruckInput) -> Result<Self::View> {
        input.validate(WriteMode::Create)?;
        let txn = db.begin().await?;
        let Some(owner) = organization::owner_for_create(&txn, scope, input.organization).await? else {
            return Err(Error::field("organization", REQUIRED));
        };
        let (Some(driver_name), Some(plate_number), Some(phone), Some(location), Some(login), Some(password)) = (
            input.driver_name,
            input.plate_number,
            input.phone,
            input.location,
            input.login,
            input.password,
        ) else {
            return Err(Error::field("driver_name", REQUIRED));
        };
        let login = login.trim().to_string();
        ensure_login_available(&txn, "login", &login, None, None).await?;

        let location = geo::insert_coordinate(&txn, location).await?;
        let truck = truck::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(owner),
            driver_name: Set(driver_name.trim().to_string()),
            plate_number: Set(plate_number.trim().to_string()),
            phone: Set(phone),
            toza_hudud: Set(input.toza_hudud.unwrap_or_else(|| DEFAULT_HUDUD.to_string())),
            location_id: Set(location.id),
            status: Set(input.status.unwrap_or_default()),
            fuel_level: Set(input.fuel_level.unwrap_or(100)),
            login: Set(login),
            password_hash: Set(hash_password(&password)?),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        info!(plate = %truck.plate_number, organization = %truck.organization_id, "Created truck");
        Ok(Located {
            item: truck,
            location: Some(location),
        })
    }

    async fn update(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
        input: TruckInput,
        mode: WriteMode,
    ) -> Result<Self::View> {
        input.validate(mode)?;
        let txn = db.begin().await?;
        let existing = find_truck(&txn, scope, id).await?;
        let owner = organization::owner_for_update(
            &txn,
            scope,
            Some(existing.organization_id),
            input.organization,
        )
        .await?;
        let login = input.login.map(|l| l.trim().to_string());
        if let Some(login) = login.as_deref() {
            ensure_login_available(&txn, "login", login, None, Some(existing.id)).await?;
        }
        let login_changed = login.as_deref().is_some_and(|l| l != existing.login);
        let owner_changed = owner.is_some_and(|o| o != existing.organization_id);
        if login_changed || owner_changed {
            revoke_login(&txn, &existing.login).await?;
        }
        if let Some(location) = input.location {
            geo::move_coordinate(&txn, existing.location_id, location).await?;
        }
        let location_id = existing.location_id;
        let mut active: truck::ActiveModel = existing.into();
        assign(&mut active.organization_id, owner);
        assign(&mut active.driver_name, input.driver_name.map(|n| n.trim().to_string()));
        assign(&mut active.plate_number, input.plate_number.map(|p| p.trim().to_string()));
        assign(&mut active.phone, input.phone);
        assign(&mut active.toza_hudud, input.toza_hudud);
        assign(&mut active.status, input.status);
        assign(&mut active.fuel_level, input.fuel_level);
        assign(&mut active.login, login);
        if let Some(password) = input.password {
            active.password_hash = Set(hash_password(&password)?);
        }
        let truck = active.update(&txn).await?;
        let view = geo::attach_location(&txn, truck, location_id).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn delete(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<()> {
        let txn = db.begin().await?;
        let truck = find_truck(&txn, scope, id).await?;
        revoke_login(&txn, &truck.login).await?;
        AuthToken::delete_many()
            .filter(AuthTokenColumn::TruckId.eq(truck.id))
            .exec(&txn)
            .await?;
        Truck::delete_by_id(truck.id).exec(&txn).await?;
        geo::delete_coordinates(&txn, [truck.location_id]).await?;
        txn.commit().await?;
        info!(plate = %truck.plate_number, "Deleted truck");
        Ok(())
    }
}

/// Trucks of one cleaning zone.
pub async fn trucks_by_hudud(
    db: &DatabaseConnection,
    scope: Scope,
    hudud: &str,
) -> Result<Vec<Located<TruckModel>>> {
    let trucks = Truck::find()
        .filter(scope.condition(TruckColumn::OrganizationId))
        .filter(TruckColumn::TozaHudud.eq(hudud))
        .order_by_asc(TruckColumn::PlateNumber)
        .all(db)
        .await?;
    geo::attach_locations(db, trucks, |t| t.location_id).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::auth::verify_password;
    use crate::entities::Coordinate;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_bin_with_defaults() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;

        let bin = create_test_waste_bin(&db, org.item.id, "Mustaqillik ko'chasi 15").await?;

        assert_eq!(bin.item.organization_id, org.item.id);
        assert_eq!(bin.item.toza_hudud, DEFAULT_HUDUD);
        assert_eq!(bin.item.fill_level, 0);
        assert!(!bin.item.is_full);
        assert_eq!(bin.item.image_source, ImageSource::Cctv);
        assert_eq!(bin.item.last_analysis, "Yangi qo'shildi");

        let json = serde_json::to_value(&bin).unwrap();
        assert_eq!(json["organization"], org.item.id.to_string());
        assert!(json.get("location_id").is_none());
        assert!(json["location"]["lat"].is_number());
        Ok(())
    }

    #[tokio::test]
    async fn test_unrestricted_create_requires_organization() -> Result<()> {
        let db = setup_test_db().await?;
        let result = WasteBins::create(
            &db,
            Scope::All,
            WasteBinInput {
                address: Some("Somewhere".into()),
                location: Some(Point::new(40.0, 71.0)),
                ..Default::default()
            },
        )
        .await;
        let Err(Error::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.contains("organization"));
        Ok(())
    }

    #[tokio::test]
    async fn test_tenant_create_is_forced_into_own_organization() -> Result<()> {
        let db = setup_test_db().await?;
        let mine = create_test_organization(&db, "fergana_admin").await?;
        let theirs = create_test_organization(&db, "kokand_admin").await?;

        let bin = WasteBins::create(
            &db,
            Scope::Organization(mine.item.id),
            WasteBinInput {
                organization: Some(theirs.item.id),
                address: Some("Al-Farg'oniy 3".into()),
                location: Some(Point::new(40.38, 71.78)),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(bin.item.organization_id, mine.item.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_tenant_lists_only_own_bins() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_organization(&db, "fergana_admin").await?;
        let b = create_test_organization(&db, "kokand_admin").await?;
        create_test_waste_bin(&db, a.item.id, "A1").await?;
        create_test_waste_bin(&db, a.item.id, "A2").await?;
        let other = create_test_waste_bin(&db, b.item.id, "B1").await?;

        let listed = WasteBins::list(&db, Scope::Organization(a.item.id)).await?;
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|bin| bin.item.organization_id == a.item.id));
        assert_eq!(WasteBins::list(&db, Scope::All).await?.len(), 3);

        let result = WasteBins::retrieve(&db, Scope::Organization(a.item.id), other.item.id).await;
        assert!(matches!(result, Err(Error::Forbidden)));
        let result = WasteBins::delete(&db, Scope::Organization(a.item.id), other.item.id).await;
        assert!(matches!(result, Err(Error::Forbidden)));
        Ok(())
    }

    #[tokio::test]
    async fn test_fill_level_drives_is_full_unless_explicit() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        let bin = create_test_waste_bin(&db, org.item.id, "A1").await?;
        let scope = Scope::Organization(org.item.id);

        let updated = WasteBins::update(
            &db,
            scope,
            bin.item.id,
            WasteBinInput {
                fill_level: Some(85),
                ..Default::default()
            },
            WriteMode::Patch,
        )
        .await?;
        assert!(updated.item.is_full);

        let updated = WasteBins::update(
            &db,
            scope,
            bin.item.id,
            WasteBinInput {
                fill_level: Some(90),
                is_full: Some(false),
                ..Default::default()
            },
            WriteMode::Patch,
        )
        .await?;
        assert_eq!(updated.item.fill_level, 90);
        assert!(!updated.item.is_full);

        let result = WasteBins::update(
            &db,
            scope,
            bin.item.id,
            WasteBinInput {
                fill_level: Some(101),
                ..Default::default()
            },
            WriteMode::Patch,
        )
        .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_put_requires_required_fields() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        let bin = create_test_waste_bin(&db, org.item.id, "A1").await?;

        let result = WasteBins::update(
            &db,
            Scope::All,
            bin.item.id,
            WasteBinInput {
                fill_level: Some(10),
                ..Default::default()
            },
            WriteMode::Replace,
        )
        .await;
        let Err(Error::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.contains("address"));
        assert!(errors.contains("location"));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_bin_removes_location() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        let bin = create_test_waste_bin(&db, org.item.id, "A1").await?;

        WasteBins::delete(&db, Scope::All, bin.item.id).await?;

        assert!(WasteBin::find_by_id(bin.item.id).one(&db).await?.is_none());
        assert!(
            Coordinate::find_by_id(bin.item.location_id)
                .one(&db)
                .await?
                .is_none()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_hudud_filter_respects_scope() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_organization(&db, "fergana_admin").await?;
        let b = create_test_organization(&db, "kokand_admin").await?;
        create_test_waste_bin(&db, a.item.id, "A1").await?;
        create_test_waste_bin(&db, b.item.id, "B1").await?;

        let all = bins_by_hudud(&db, Scope::All, DEFAULT_HUDUD).await?;
        assert_eq!(all.len(), 2);
        let mine = bins_by_hudud(&db, Scope::Organization(a.item.id), DEFAULT_HUDUD).await?;
        assert_eq!(mine.len(), 1);
        assert!(bins_by_hudud(&db, Scope::All, "2-sonli Toza Hudud").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_image_update_from_bot() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        let bin = create_test_waste_bin(&db, org.item.id, "A1").await?;

        let updated = update_image(
            &db,
            Scope::All,
            bin.item.id,
            ImageUpdate {
                image_url: Some("https://example.com/bin.jpg".into()),
                fill_level: Some(95),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(updated.item.image_source, ImageSource::Bot);
        assert_eq!(updated.item.image_url.as_deref(), Some("https://example.com/bin.jpg"));
        assert!(updated.item.is_full);

        let result = update_image(&db, Scope::All, bin.item.id, ImageUpdate::default()).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_truck_password_is_hashed_and_login_unique() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        let truck = create_test_truck(&db, org.item.id, "driver_fa_777_aa").await?;

        assert_ne!(truck.item.password_hash, TEST_PASSWORD);
        assert!(verify_password(TEST_PASSWORD, &truck.item.password_hash));
        assert_eq!(truck.item.fuel_level, 100);
        assert_eq!(truck.item.status, TruckStatus::Idle);
        let json = serde_json::to_value(&truck).unwrap();
        assert!(json.get("password_hash").is_none());

        // Same login as an organization
        let result = create_test_truck(&db, org.item.id, "fergana_admin").await;
        assert!(matches!(result, Err(Error::Validation(_))));
        // Same login as another truck
        let result = create_test_truck(&db, org.item.id, "driver_fa_777_aa").await;
        assert!(matches!(result, Err(Error::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_truck_patch_keeps_own_login() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        let truck = create_test_truck(&db, org.item.id, "driver_1").await?;

        let updated = Trucks::update(
            &db,
            Scope::Organization(org.item.id),
            truck.item.id,
            TruckInput {
                login: Some("driver_1".into()),
                status: Some(TruckStatus::Busy),
                ..Default::default()
            },
            WriteMode::Patch,
        )
        .await?;
        assert_eq!(updated.item.status, TruckStatus::Busy);
        assert_eq!(trucks_by_hudud(&db, Scope::All, DEFAULT_HUDUD).await?.len(), 1);
        Ok(())
    }
}

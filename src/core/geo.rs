//! Coordinates and the administrative hierarchy (regions and districts).
//!
//! A [`Coordinate`] row is owned by exactly one parent row. Parents embed it
//! as a nested `{lat, lng}` object on write and as the full row on read; the
//! helpers here create, move and delete it inside the parent's transaction.

use super::organization;
use super::resource::Resource;
use super::tenant::Scope;
use super::validation::{Checker, WriteMode, assign, missing_reference};
use crate::entities::{
    Coordinate, CoordinateModel, District, DistrictColumn, DistrictModel, Organization,
    OrganizationColumn, Region, RegionModel, coordinate, district, region,
};
use crate::errors::{Error, Result};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// A nested `{lat, lng}` payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

impl Point {
    /// Builds a point.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A row with its owned location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Located<M> {
    /// The row itself
    #[serde(flatten)]
    pub item: M,
    /// Owned location
    pub location: Option<CoordinateModel>,
}

/// A row with its owned center point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Centered<M> {
    /// The row itself
    #[serde(flatten)]
    pub item: M,
    /// Owned center
    pub center: Option<CoordinateModel>,
}

/// Validates an optional point field.
pub fn check_point(checker: &mut Checker, field: &str, point: Option<&Point>) {
    checker.required(field, point);
    if let Some(point) = point {
        if !(-90.0..=90.0).contains(&point.lat) {
            checker.add(field, "Latitude must be between -90 and 90.");
        }
        if !(-180.0..=180.0).contains(&point.lng) {
            checker.add(field, "Longitude must be between -180 and 180.");
        }
    }
}

/// Inserts an owned coordinate.
pub async fn insert_coordinate<C: ConnectionTrait>(db: &C, point: Point) -> Result<CoordinateModel> {
    coordinate::ActiveModel {
        lat: Set(point.lat),
        lng: Set(point.lng),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Moves an owned coordinate in place, keeping its id.
pub async fn move_coordinate<C: ConnectionTrait>(db: &C, id: i32, point: Point) -> Result<()> {
    coordinate::ActiveModel {
        id: Set(id),
        lat: Set(point.lat),
        lng: Set(point.lng),
    }
    .update(db)
    .await?;
    Ok(())
}

/// Deletes owned coordinates.
pub async fn delete_coordinates<C, I>(db: &C, ids: I) -> Result<()>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = i32>,
{
    let ids: Vec<i32> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(());
    }
    Coordinate::delete_many()
        .filter(coordinate::Column::Id.is_in(ids))
        .exec(db)
        .await?;
    Ok(())
}

/// Loads one coordinate.
pub async fn find_coordinate<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<CoordinateModel>> {
    Coordinate::find_by_id(id).one(db).await.map_err(Into::into)
}

/// Loads many coordinates keyed by id.
pub async fn coordinate_map<C, I>(db: &C, ids: I) -> Result<HashMap<i32, CoordinateModel>>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = i32>,
{
    let ids: Vec<i32> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(Coordinate::find()
        .filter(coordinate::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect())
}

/// Pairs rows with their owned locations, preserving order.
pub async fn attach_locations<C, M, F>(db: &C, rows: Vec<M>, location_of: F) -> Result<Vec<Located<M>>>
where
    C: ConnectionTrait,
    F: Fn(&M) -> i32,
{
    let mut locations = coordinate_map(db, rows.iter().map(&location_of)).await?;
    Ok(rows
        .into_iter()
        .map(|item| {
            let location = locations.remove(&location_of(&item));
            Located { item, location }
        })
        .collect())
}

/// Pairs one row with its owned location.
pub async fn attach_location<C: ConnectionTrait, M>(db: &C, item: M, location_id: i32) -> Result<Located<M>> {
    let location = find_coordinate(db, location_id).await?;
    Ok(Located { item, location })
}

/// Region write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegionInput {
    /// Region name
    pub name: Option<String>,
    /// Map center
    pub center: Option<Point>,
}

impl RegionInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("name", self.name.as_ref());
        check_point(&mut checker, "center", self.center.as_ref());
        checker.finish()
    }
}

/// Region resource
pub struct Regions;

async fn region_view<C: ConnectionTrait>(db: &C, region: RegionModel) -> Result<Centered<RegionModel>> {
    let center = find_coordinate(db, region.center_id).await?;
    Ok(Centered { item: region, center })
}

impl Resource for Regions {
    const NAME: &'static str = "regions";
    type Input = RegionInput;
    type View = Centered<RegionModel>;

    async fn list(db: &DatabaseConnection, _scope: Scope) -> Result<Vec<Self::View>> {
        Ok(Region::find()
            .find_also_related(Coordinate)
            .order_by_asc(region::Column::Name)
            .all(db)
            .await?
            .into_iter()
            .map(|(item, center)| Centered { item, center })
            .collect())
    }

    async fn retrieve(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<Self::View> {
        let region = Region::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Region", id))?;
        region_view(db, region).await
    }

    async fn create(db: &DatabaseConnection, scope: Scope, input: RegionInput) -> Result<Self::View> {
        scope.ensure_unrestricted()?;
        input.validate(WriteMode::Create)?;
        let (Some(name), Some(center)) = (input.name, input.center) else {
            return Err(Error::field("name", super::validation::REQUIRED));
        };
        let txn = db.begin().await?;
        let center = insert_coordinate(&txn, center).await?;
        let region = region::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.trim().to_string()),
            center_id: Set(center.id),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        info!(region = %region.name, "Created region");
        Ok(Centered { item: region, center: Some(center) })
    }

    async fn update(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
        input: RegionInput,
        mode: WriteMode,
    ) -> Result<Self::View> {
        scope.ensure_unrestricted()?;
        input.validate(mode)?;
        let txn = db.begin().await?;
        let existing = Region::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("Region", id))?;
        if let Some(center) = input.center {
            move_coordinate(&txn, existing.center_id, center).await?;
        }
        let mut active: region::ActiveModel = existing.into();
        assign(&mut active.name, input.name.map(|n| n.trim().to_string()));
        let region = active.update(&txn).await?;
        let view = region_view(&txn, region).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn delete(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<()> {
        scope.ensure_unrestricted()?;
        let txn = db.begin().await?;
        let region = Region::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("Region", id))?;

        let organizations = Organization::find()
            .filter(OrganizationColumn::RegionId.eq(id))
            .all(&txn)
            .await?;
        for org in organizations {
            organization::purge(&txn, &org).await?;
        }

        let districts = District::find()
            .filter(DistrictColumn::RegionId.eq(id))
            .all(&txn)
            .await?;
        for district in districts {
            delete_district_rows(&txn, &district).await?;
        }

        Region::delete_by_id(id).exec(&txn).await?;
        delete_coordinates(&txn, [region.center_id]).await?;
        txn.commit().await?;
        info!(region = %region.name, "Deleted region");
        Ok(())
    }
}

/// District write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DistrictInput {
    /// District name
    pub name: Option<String>,
    /// Parent region id
    pub region: Option<Uuid>,
    /// Map center
    pub center: Option<Point>,
}

impl DistrictInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("name", self.name.as_ref());
        checker.required("region", self.region.as_ref());
        check_point(&mut checker, "center", self.center.as_ref());
        checker.finish()
    }
}

async fn ensure_region<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<()> {
    match Region::find_by_id(id).one(db).await? {
        Some(_) => Ok(()),
        None => Err(missing_reference("region", id)),
    }
}

async fn district_view<C: ConnectionTrait>(
    db: &C,
    district: DistrictModel,
) -> Result<Centered<DistrictModel>> {
    let center = find_coordinate(db, district.center_id).await?;
    Ok(Centered { item: district, center })
}

async fn delete_district_rows<C: ConnectionTrait>(db: &C, district: &DistrictModel) -> Result<()> {
    let organizations = Organization::find()
        .filter(OrganizationColumn::DistrictId.eq(district.id))
        .all(db)
        .await?;
    for org in organizations {
        organization::purge(db, &org).await?;
    }
    District::delete_by_id(district.id).exec(db).await?;
    delete_coordinates(db, [district.center_id]).await
}

/// District resource
pub struct Districts;

impl Resource for Districts {
    const NAME: &'static str = "districts";
    type Input = DistrictInput;
    type View = Centered<DistrictModel>;

    async fn list(db: &DatabaseConnection, _scope: Scope) -> Result<Vec<Self::View>> {
        Ok(District::find()
            .find_also_related(Coordinate)
            .order_by_asc(district::Column::Name)
            .all(db)
            .await?
            .into_iter()
            .map(|(item, center)| Centered { item, center })
            .collect())
    }

    async fn retrieve(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<Self::View> {
        let district = District::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("District", id))?;
        district_view(db, district).await
    }

    async fn create(db: &DatabaseConnection, scope: Scope, input: DistrictInput) -> Result<Self::View> {
        scope.ensure_unrestricted()?;
        input.validate(WriteMode::Create)?;
        let (Some(name), Some(region_id), Some(center)) = (input.name, input.region, input.center)
        else {
            return Err(Error::field("name", super::validation::REQUIRED));
        };
        let txn = db.begin().await?;
        ensure_region(&txn, region_id).await?;
        let center = insert_coordinate(&txn, center).await?;
        let district = district::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.trim().to_string()),
            region_id: Set(region_id),
            center_id: Set(center.id),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(Centered { item: district, center: Some(center) })
    }

    async fn update(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
        input: DistrictInput,
        mode: WriteMode,
    ) -> Result<Self::View> {
        scope.ensure_unrestricted()?;
        input.validate(mode)?;
        let txn = db.begin().await?;
        let existing = District::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("District", id))?;
        if let Some(region_id) = input.region {
            ensure_region(&txn, region_id).await?;
        }
        if let Some(center) = input.center {
            move_coordinate(&txn, existing.center_id, center).await?;
        }
        let mut active: district::ActiveModel = existing.into();
        assign(&mut active.name, input.name.map(|n| n.trim().to_string()));
        assign(&mut active.region_id, input.region);
        let district = active.update(&txn).await?;
        let view = district_view(&txn, district).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn delete(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<()> {
        scope.ensure_unrestricted()?;
        let txn = db.begin().await?;
        let district = District::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("District", id))?;
        delete_district_rows(&txn, &district).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// Districts of one region, alphabetically.
pub async fn districts_of_region(
    db: &DatabaseConnection,
    region_id: Uuid,
) -> Result<Vec<Centered<DistrictModel>>> {
    if Region::find_by_id(region_id).one(db).await?.is_none() {
        return Err(Error::not_found("Region", region_id));
    }
    Ok(District::find()
        .filter(DistrictColumn::RegionId.eq(region_id))
        .find_also_related(Coordinate)
        .order_by_asc(district::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(|(item, center)| Centered { item, center })
        .collect())
}

/// Finds a region by id or, failing that, by exact name.
pub async fn resolve_region<C: ConnectionTrait>(db: &C, key: &str) -> Result<Option<RegionModel>> {
    if let Ok(id) = Uuid::parse_str(key) {
        if let Some(region) = Region::find_by_id(id).one(db).await? {
            return Ok(Some(region));
        }
    }
    Region::find()
        .filter(region::Column::Name.eq(key))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a district by id or, failing that, by exact name.
pub async fn resolve_district<C: ConnectionTrait>(db: &C, key: &str) -> Result<Option<DistrictModel>> {
    if let Ok(id) = Uuid::parse_str(key) {
        if let Some(district) = District::find_by_id(id).one(db).await? {
            return Ok(Some(district));
        }
    }
    District::find()
        .filter(district::Column::Name.eq(key))
        .one(db)
        .await
        .map_err(Into::into)
}

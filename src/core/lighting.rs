//! Street lighting: poles inspected by camera, and the frame regions (ROIs)
//! the inspection looks at.

use super::geo::{self, Point, check_point};
use super::organization;
use super::resource::Resource;
use super::tenant::Scope;
use super::validation::{
    Checker, REQUIRED, WriteMode, assign, dedup_ids, ensure_references,
};
use crate::entities::light_pole::LightStatus;
use crate::entities::{
    CoordinateModel, LightPole, LightPoleColumn, LightPoleModel, LightRoi, LightRoiColumn,
    LightRoiModel, PoleRoi, PoleRoiColumn, light_pole, light_roi, pole_roi,
};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, LoaderTrait, QueryOrder, Set, TransactionTrait,
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// Light ROI write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LightRoiInput {
    /// Left edge, relative to the frame
    pub x: Option<f64>,
    /// Top edge, relative to the frame
    pub y: Option<f64>,
    /// Width, relative to the frame
    pub width: Option<f64>,
    /// Height, relative to the frame
    pub height: Option<f64>,
    /// ROI label
    pub label: Option<String>,
}

impl LightRoiInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        for (field, value) in [("x", self.x), ("y", self.y)] {
            checker.required(field, value.as_ref());
            checker.finite(field, value);
        }
        for (field, value) in [("width", self.width), ("height", self.height)] {
            checker.required(field, value.as_ref());
            checker.float_range(field, value, 0.0, f64::MAX);
        }
        checker.text("label", self.label.as_ref());
        checker.finish()
    }
}

async fn find_roi<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<LightRoiModel> {
    LightRoi::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("LightROI", id))
}

/// Light ROI resource
pub struct LightRois;

impl Resource for LightRois {
    const NAME: &'static str = "light-rois";
    type Input = LightRoiInput;
    type View = LightRoiModel;

    async fn list(db: &DatabaseConnection, _scope: Scope) -> Result<Vec<LightRoiModel>> {
        Ok(LightRoi::find().order_by_asc(LightRoiColumn::Label).all(db).await?)
    }

    async fn retrieve(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<LightRoiModel> {
        find_roi(db, id).await
    }

    async fn create(db: &DatabaseConnection, _scope: Scope, input: LightRoiInput) -> Result<LightRoiModel> {
        input.validate(WriteMode::Create)?;
        let (Some(x), Some(y), Some(width), Some(height), Some(label)) =
            (input.x, input.y, input.width, input.height, input.label)
        else {
            return Err(Error::field("x", REQUIRED));
        };
        Ok(light_roi::ActiveModel {
            id: Set(Uuid::new_v4()),
            x: Set(x),
            y: Set(y),
            width: Set(width),
            height: Set(height),
            label: Set(label),
        }
        .insert(db)
        .await?)
    }

    async fn update(
        db: &DatabaseConnection,
        _scope: Scope,
        id: Uuid,
        input: LightRoiInput,
        mode: WriteMode,
    ) -> Result<LightRoiModel> {
        input.validate(mode)?;
        let mut active: light_roi::ActiveModel = find_roi(db, id).await?.into();
        assign(&mut active.x, input.x);
        assign(&mut active.y, input.y);
        assign(&mut active.width, input.width);
        assign(&mut active.height, input.height);
        assign(&mut active.label, input.label);
        Ok(active.update(db).await?)
    }

    async fn delete(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<()> {
        find_roi(db, id).await?;
        let txn = db.begin().await?;
        PoleRoi::delete_many()
            .filter(PoleRoiColumn::RoiId.eq(id))
            .exec(&txn)
            .await?;
        LightRoi::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// Light pole with its location and inspected regions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightPoleView {
    /// The row itself
    #[serde(flatten)]
    pub item: LightPoleModel,
    /// Pole position
    pub location: Option<CoordinateModel>,
    /// Regions of interest on the camera frame
    pub rois: Vec<LightRoiModel>,
}

/// Light pole write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LightPoleInput {
    /// Owning organization id
    pub organization: Option<Uuid>,
    /// Pole position
    pub location: Option<Point>,
    /// Street address
    pub address: Option<String>,
    /// Camera stream URL
    pub camera_url: Option<String>,
    /// Current status
    pub status: Option<LightStatus>,
    /// Measured luminance
    pub luminance: Option<f64>,
    /// Last inspection time
    pub last_check: Option<DateTime<Utc>>,
    /// ROI ids; replaces the linked set when present
    pub rois: Option<Vec<Uuid>>,
}

impl LightPoleInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        check_point(&mut checker, "location", self.location.as_ref());
        checker.text("address", self.address.as_ref());
        checker.text("camera_url", self.camera_url.as_ref());
        checker.required("status", self.status.as_ref());
        checker.required("luminance", self.luminance.as_ref());
        checker.float_range("luminance", self.luminance, 0.0, f64::MAX);
        checker.required("last_check", self.last_check.as_ref());
        checker.finish()
    }
}

async fn find_pole<C: ConnectionTrait>(db: &C, scope: Scope, id: Uuid) -> Result<LightPoleModel> {
    let pole = LightPole::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("LightPole", id))?;
    scope.ensure(pole.organization_id)?;
    Ok(pole)
}

async fn pole_views<C: ConnectionTrait>(db: &C, poles: Vec<LightPoleModel>) -> Result<Vec<LightPoleView>> {
    let rois = poles.load_many_to_many(LightRoi, PoleRoi, db).await?;
    let mut locations = geo::coordinate_map(db, poles.iter().map(|p| p.location_id)).await?;
    Ok(poles
        .into_iter()
        .zip(rois)
        .map(|(item, mut rois)| {
            rois.sort_by(|a, b| a.label.cmp(&b.label));
            LightPoleView {
                location: locations.remove(&item.location_id),
                rois,
                item,
            }
        })
        .collect())
}

async fn pole_view<C: ConnectionTrait>(db: &C, pole: LightPoleModel) -> Result<LightPoleView> {
    pole_views(db, vec![pole])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("LightPole", "view"))
}

async fn replace_rois<C: ConnectionTrait>(db: &C, pole_id: Uuid, roi_ids: Vec<Uuid>) -> Result<()> {
    let roi_ids = dedup_ids(roi_ids);
    ensure_references::<LightRoi, _>(db, "rois", &roi_ids).await?;
    PoleRoi::delete_many()
        .filter(PoleRoiColumn::PoleId.eq(pole_id))
        .exec(db)
        .await?;
    if roi_ids.is_empty() {
        return Ok(());
    }
    PoleRoi::insert_many(roi_ids.into_iter().map(|roi_id| pole_roi::ActiveModel {
        pole_id: Set(pole_id),
        roi_id: Set(roi_id),
    }))
    .exec_without_returning(db)
    .await?;
    Ok(())
}

/// Light pole resource
pub struct LightPoles;

impl Resource for LightPoles {
    const NAME: &'static str = "light-poles";
    type Input = LightPoleInput;
    type View = LightPoleView;

    async fn list(db: &DatabaseConnection, scope: Scope) -> Result<Vec<LightPoleView>> {
        let poles = LightPole::find()
            .filter(scope.condition(LightPoleColumn::OrganizationId))
            .order_by_asc(LightPoleColumn::Address)
            .all(db)
            .await?;
        pole_views(db, poles).await
    }

    async fn retrieve(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<LightPoleView> {
        let pole = find_pole(db, scope, id).await?;
        pole_view(db, pole).await
    }

    async fn create(db: &DatabaseConnection, scope: Scope, input: LightPoleInput) -> Result<LightPoleView> {
        input.validate(WriteMode::Create)?;
        let (Some(location), Some(address), Some(camera_url), Some(status), Some(luminance), Some(last_check)) = (
            input.location,
            input.address,
            input.camera_url,
            input.status,
            input.luminance,
            input.last_check,
        ) else {
            return Err(Error::field("address", REQUIRED));
        };
        let txn = db.begin().await?;
        let owner = organization::owner_for_create(&txn, scope, input.organization).await?;
        let location = geo::insert_coordinate(&txn, location).await?;
        let pole = light_pole::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(owner),
            location_id: Set(location.id),
            address: Set(address),
            camera_url: Set(camera_url),
            status: Set(status),
            luminance: Set(luminance),
            last_check: Set(last_check),
        }
        .insert(&txn)
        .await?;
        replace_rois(&txn, pole.id, input.rois.unwrap_or_default()).await?;
        let view = pole_view(&txn, pole).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn update(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
        input: LightPoleInput,
        mode: WriteMode,
    ) -> Result<LightPoleView> {
        input.validate(mode)?;
        let txn = db.begin().await?;
        let existing = find_pole(&txn, scope, id).await?;
        let owner =
            organization::owner_for_update(&txn, scope, existing.organization_id, input.organization).await?;
        if let Some(location) = input.location {
            geo::move_coordinate(&txn, existing.location_id, location).await?;
        }
        let mut active: light_pole::ActiveModel = existing.into();
        active.organization_id = Set(owner);
        assign(&mut active.address, input.address);
        assign(&mut active.camera_url, input.camera_url);
        assign(&mut active.status, input.status);
        assign(&mut active.luminance, input.luminance);
        assign(&mut active.last_check, input.last_check);
        let pole = active.update(&txn).await?;
        if let Some(rois) = input.rois {
            replace_rois(&txn, pole.id, rois).await?;
        }
        let view = pole_view(&txn, pole).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn delete(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<()> {
        let txn = db.begin().await?;
        let pole = find_pole(&txn, scope, id).await?;
        PoleRoi::delete_many()
            .filter(PoleRoiColumn::PoleId.eq(id))
            .exec(&txn)
            .await?;
        LightPole::delete_by_id(id).exec(&txn).await?;
        geo::delete_coordinates(&txn, [pole.location_id]).await?;
        txn.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::Coordinate;
    use crate::test_utils::*;

    async fn create_roi(db: &DatabaseConnection, label: &str) -> Result<LightRoiModel> {
        LightRois::create(
            db,
            Scope::All,
            LightRoiInput {
                x: Some(10.0),
                y: Some(20.0),
                width: Some(64.0),
                height: Some(48.0),
                label: Some(label.into()),
            },
        )
        .await
    }

    fn pole_input(address: &str, rois: Vec<Uuid>) -> LightPoleInput {
        LightPoleInput {
            location: Some(Point::new(40.37, 71.78)),
            address: Some(address.into()),
            camera_url: Some("rtsp://cam/pole".into()),
            status: Some(LightStatus::On),
            luminance: Some(820.0),
            last_check: Some(Utc::now()),
            rois: Some(rois),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_roi_rejects_negative_size() -> Result<()> {
        let db = setup_test_db().await?;
        let result = LightRois::create(
            &db,
            Scope::All,
            LightRoiInput {
                x: Some(0.0),
                y: Some(0.0),
                width: Some(-1.0),
                height: Some(5.0),
                label: Some("lamp".into()),
            },
        )
        .await;
        let Err(Error::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.contains("width"));
        Ok(())
    }

    #[tokio::test]
    async fn test_pole_embeds_rois_and_location() -> Result<()> {
        let db = setup_test_db().await?;
        let lamp = create_roi(&db, "lamp").await?;
        let road = create_roi(&db, "road").await?;
        let pole = LightPoles::create(&db, Scope::All, pole_input("Al-Farg'oniy 12", vec![road.id, lamp.id])).await?;

        let labels: Vec<_> = pole.rois.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["lamp", "road"]);
        let json = serde_json::to_value(&pole).unwrap();
        assert_eq!(json["status"], "ON");
        assert!((json["location"]["lat"].as_f64().unwrap() - 40.37).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_deleting_roi_unlinks_it() -> Result<()> {
        let db = setup_test_db().await?;
        let lamp = create_roi(&db, "lamp").await?;
        let pole = LightPoles::create(&db, Scope::All, pole_input("Navoiy 3", vec![lamp.id])).await?;

        LightRois::delete(&db, Scope::All, lamp.id).await?;
        let pole = LightPoles::retrieve(&db, Scope::All, pole.item.id).await?;
        assert!(pole.rois.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_pole_keeps_shared_rois() -> Result<()> {
        let db = setup_test_db().await?;
        let lamp = create_roi(&db, "lamp").await?;
        let pole = LightPoles::create(&db, Scope::All, pole_input("Navoiy 3", vec![lamp.id])).await?;

        LightPoles::delete(&db, Scope::All, pole.item.id).await?;
        assert!(LightRois::retrieve(&db, Scope::All, lamp.id).await.is_ok());
        assert!(Coordinate::find_by_id(pole.item.location_id).one(&db).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_tenant_cannot_touch_foreign_pole() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        let other = create_test_organization(&db, "kokand_admin").await?;
        let pole = LightPoles::create(&db, Scope::Organization(other.item.id), pole_input("A", vec![])).await?;

        let scope = Scope::Organization(org.item.id);
        let patch = LightPoleInput {
            status: Some(LightStatus::Off),
            ..Default::default()
        };
        let result = LightPoles::update(&db, scope, pole.item.id, patch, WriteMode::Patch).await;
        assert!(matches!(result, Err(Error::Forbidden)));
        assert!(matches!(LightPoles::delete(&db, scope, pole.item.id).await, Err(Error::Forbidden)));
        Ok(())
    }
}

//! SOS columns: street emergency call points with a camera.
//!
//! A column owns a location and a device health row; both are written
//! together with the column and removed with it.

use super::device_health::{self, DeviceHealthInput};
use super::geo::{self, Point, check_point};
use super::organization;
use super::resource::Resource;
use super::tenant::Scope;
use super::validation::{Checker, REQUIRED, WriteMode, assign, assign_opt};
use crate::entities::sos_column::SosStatus;
use crate::entities::types::Labels;
use crate::entities::{
    CoordinateModel, DeviceHealthModel, SosColumn, SosColumnColumn, SosColumnModel, sos_column,
};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// SOS column with its owned rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SosColumnView {
    /// The row itself
    #[serde(flatten)]
    pub item: SosColumnModel,
    /// Column position
    pub location: Option<CoordinateModel>,
    /// Battery and signal state
    pub device_health: Option<DeviceHealthModel>,
}

/// SOS column write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SosColumnInput {
    /// Owning organization id
    pub organization: Option<Uuid>,
    /// Column name
    pub name: Option<String>,
    /// Column position
    pub location: Option<Point>,
    /// Neighbourhood (MFY) name
    pub mfy: Option<String>,
    /// Current status
    pub status: Option<SosStatus>,
    /// Camera stream URL
    pub camera_url: Option<String>,
    /// Last self-test time
    pub last_test: Option<DateTime<Utc>>,
    /// Battery and signal state
    pub device_health: Option<DeviceHealthInput>,
    /// Confidence of the last analysis
    pub ai_confidence: Option<f64>,
    /// Caller stress estimate, 0 to 100
    pub ai_stress_level: Option<f64>,
    /// Objects detected in the camera feed
    pub ai_detected_objects: Option<Vec<String>>,
    /// Keywords heard on the call
    pub ai_keywords: Option<Vec<String>>,
}

impl SosColumnInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("name", self.name.as_ref());
        check_point(&mut checker, "location", self.location.as_ref());
        checker.text("mfy", self.mfy.as_ref());
        checker.required("status", self.status.as_ref());
        checker.text("camera_url", self.camera_url.as_ref());
        checker.required("last_test", self.last_test.as_ref());
        device_health::check(&mut checker, "device_health", self.device_health.as_ref());
        checker.float_range("ai_confidence", self.ai_confidence, 0.0, 100.0);
        checker.float_range("ai_stress_level", self.ai_stress_level, 0.0, 100.0);
        checker.finish()
    }
}

async fn find_column<C: ConnectionTrait>(db: &C, scope: Scope, id: Uuid) -> Result<SosColumnModel> {
    let column = SosColumn::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("SOSColumn", id))?;
    scope.ensure(column.organization_id)?;
    Ok(column)
}

async fn column_views<C: ConnectionTrait>(db: &C, columns: Vec<SosColumnModel>) -> Result<Vec<SosColumnView>> {
    let mut locations = geo::coordinate_map(db, columns.iter().map(|c| c.location_id)).await?;
    let mut health = device_health::load_map(db, columns.iter().map(|c| c.device_health_id)).await?;
    Ok(columns
        .into_iter()
        .map(|item| SosColumnView {
            location: locations.remove(&item.location_id),
            device_health: health.remove(&item.device_health_id),
            item,
        })
        .collect())
}

async fn column_view<C: ConnectionTrait>(db: &C, column: SosColumnModel) -> Result<SosColumnView> {
    column_views(db, vec![column])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("SOSColumn", "view"))
}

/// SOS column resource
pub struct SosColumns;

impl Resource for SosColumns {
    const NAME: &'static str = "sos-columns";
    type Input = SosColumnInput;
    type View = SosColumnView;

    async fn list(db: &DatabaseConnection, scope: Scope) -> Result<Vec<SosColumnView>> {
        let columns = SosColumn::find()
            .filter(scope.condition(SosColumnColumn::OrganizationId))
            .order_by_asc(SosColumnColumn::Name)
            .all(db)
            .await?;
        column_views(db, columns).await
    }

    async fn retrieve(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<SosColumnView> {
        let column = find_column(db, scope, id).await?;
        column_view(db, column).await
    }

    async fn create(db: &DatabaseConnection, scope: Scope, input: SosColumnInput) -> Result<SosColumnView> {
        input.validate(WriteMode::Create)?;
        let (
            Some(name),
            Some(location),
            Some(mfy),
            Some(status),
            Some(camera_url),
            Some(last_test),
            Some(health),
        ) = (
            input.name,
            input.location,
            input.mfy,
            input.status,
            input.camera_url,
            input.last_test,
            input.device_health,
        )
        else {
            return Err(Error::field("name", REQUIRED));
        };
        let txn = db.begin().await?;
        let owner = organization::owner_for_create(&txn, scope, input.organization).await?;
        let location = geo::insert_coordinate(&txn, location).await?;
        let health = device_health::insert(&txn, health).await?;
        let column = sos_column::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(owner),
            name: Set(name.trim().to_string()),
            location_id: Set(location.id),
            mfy: Set(mfy),
            status: Set(status),
            camera_url: Set(camera_url),
            last_test: Set(last_test),
            device_health_id: Set(health.id),
            ai_confidence: Set(input.ai_confidence),
            ai_stress_level: Set(input.ai_stress_level),
            ai_detected_objects: Set(input.ai_detected_objects.map(Labels)),
            ai_keywords: Set(input.ai_keywords.map(Labels)),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        info!(column = %column.name, "Created SOS column");
        Ok(SosColumnView {
            item: column,
            location: Some(location),
            device_health: Some(health),
        })
    }

    async fn update(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
        input: SosColumnInput,
        mode: WriteMode,
    ) -> Result<SosColumnView> {
        input.validate(mode)?;
        let txn = db.begin().await?;
        let existing = find_column(&txn, scope, id).await?;
        let owner =
            organization::owner_for_update(&txn, scope, existing.organization_id, input.organization).await?;
        if let Some(location) = input.location {
            geo::move_coordinate(&txn, existing.location_id, location).await?;
        }
        if let Some(health) = input.device_health {
            device_health::update(&txn, existing.device_health_id, health).await?;
        }
        let mut active: sos_column::ActiveModel = existing.into();
        active.organization_id = Set(owner);
        assign(&mut active.name, input.name.map(|n| n.trim().to_string()));
        assign(&mut active.mfy, input.mfy);
        assign(&mut active.status, input.status);
        assign(&mut active.camera_url, input.camera_url);
        assign(&mut active.last_test, input.last_test);
        assign_opt(&mut active.ai_confidence, input.ai_confidence);
        assign_opt(&mut active.ai_stress_level, input.ai_stress_level);
        assign_opt(&mut active.ai_detected_objects, input.ai_detected_objects.map(Labels));
        assign_opt(&mut active.ai_keywords, input.ai_keywords.map(Labels));
        let column = active.update(&txn).await?;
        let view = column_view(&txn, column).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn delete(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<()> {
        let txn = db.begin().await?;
        let column = find_column(&txn, scope, id).await?;
        SosColumn::delete_by_id(id).exec(&txn).await?;
        geo::delete_coordinates(&txn, [column.location_id]).await?;
        device_health::delete(&txn, [column.device_health_id]).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// SOS columns in one status.
pub async fn sos_by_status(db: &DatabaseConnection, scope: Scope, status: SosStatus) -> Result<Vec<SosColumnView>> {
    let columns = SosColumn::find()
        .filter(scope.condition(SosColumnColumn::OrganizationId))
        .filter(SosColumnColumn::Status.eq(status))
        .order_by_asc(SosColumnColumn::Name)
        .all(db)
        .await?;
    column_views(db, columns).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::{Coordinate, DeviceHealth};
    use crate::test_utils::*;

    fn column_input(name: &str, status: SosStatus) -> SosColumnInput {
        SosColumnInput {
            name: Some(name.into()),
            location: Some(Point::new(40.39, 71.79)),
            mfy: Some("Yangi hayot MFY".into()),
            status: Some(status),
            camera_url: Some("rtsp://cam/sos".into()),
            last_test: Some(Utc::now()),
            device_health: Some(DeviceHealthInput {
                battery_level: Some(87.0),
                signal_strength: Some(64.0),
                last_ping: Some(Utc::now()),
                firmware_version: Some("v2.1".into()),
                is_online: None,
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_column_with_owned_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let mut input = column_input("SOS-1", SosStatus::Idle);
        input.ai_keywords = Some(vec!["yordam".into()]);
        let column = SosColumns::create(&db, Scope::All, input).await?;

        let health = column.device_health.as_ref().unwrap();
        assert!(health.is_online);
        assert_eq!(health.firmware_version, "v2.1");
        assert!(column.location.is_some());

        let json = serde_json::to_value(&column).unwrap();
        assert_eq!(json["status"], "IDLE");
        assert_eq!(json["ai_keywords"][0], "yordam");
        assert!(json["ai_confidence"].is_null());
        assert!(json.get("device_health_id").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_incomplete_device_health_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let mut input = column_input("SOS-1", SosStatus::Idle);
        input.device_health = Some(DeviceHealthInput {
            battery_level: Some(120.0),
            ..Default::default()
        });
        let result = SosColumns::create(&db, Scope::All, input).await;
        let Err(Error::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.contains("device_health"));
        Ok(())
    }

    #[tokio::test]
    async fn test_patch_nested_health() -> Result<()> {
        let db = setup_test_db().await?;
        let column = SosColumns::create(&db, Scope::All, column_input("SOS-1", SosStatus::Idle)).await?;

        let patch = SosColumnInput {
            status: Some(SosStatus::Active),
            device_health: Some(DeviceHealthInput {
                is_online: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        let updated = SosColumns::update(&db, Scope::All, column.item.id, patch, WriteMode::Patch).await?;
        assert_eq!(updated.item.status, SosStatus::Active);
        let health = updated.device_health.unwrap();
        assert!(!health.is_online);
        assert!((health.battery_level - 87.0).abs() < f64::EPSILON);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_removes_owned_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let column = SosColumns::create(&db, Scope::All, column_input("SOS-1", SosStatus::Idle)).await?;
        SosColumns::delete(&db, Scope::All, column.item.id).await?;

        assert!(Coordinate::find_by_id(column.item.location_id).one(&db).await?.is_none());
        assert!(DeviceHealth::find_by_id(column.item.device_health_id).one(&db).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_status_filter_respects_scope() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "kokand_admin").await?;
        let scope = Scope::Organization(org.item.id);
        SosColumns::create(&db, scope, column_input("Mine", SosStatus::Active)).await?;
        SosColumns::create(&db, Scope::All, column_input("Shared", SosStatus::Active)).await?;

        assert_eq!(sos_by_status(&db, scope, SosStatus::Active).await?.len(), 1);
        assert_eq!(sos_by_status(&db, Scope::All, SosStatus::Active).await?.len(), 2);
        assert!(sos_by_status(&db, Scope::All, SosStatus::Idle).await?.is_empty());
        Ok(())
    }
}

//! Environmental monitoring: air quality sensors and eco violations.
//!
//! Both may belong to an organization. Rows without an owner are only
//! visible to unrestricted sessions.

use super::geo::{self, Located, Point, check_point};
use super::organization;
use super::resource::Resource;
use super::tenant::Scope;
use super::validation::{Checker, REQUIRED, WriteMode, assign, assign_opt};
use crate::entities::eco_violation::Gender;
use crate::entities::types::SensorStatus;
use crate::entities::{
    AirSensor, AirSensorColumn, AirSensorModel, EcoViolation, EcoViolationColumn,
    EcoViolationModel, air_sensor, eco_violation,
};
use crate::errors::{Error, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*,
};
use serde::Deserialize;
use tracing::info;

/// Air sensor write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AirSensorInput {
    /// Owning organization id
    pub organization: Option<Uuid>,
    /// Display name
    pub name: Option<String>,
    /// Neighbourhood (MFY) name
    pub mfy: Option<String>,
    /// Position as `{lat, lng}`
    pub location: Option<Point>,
    /// Air quality index
    pub aqi: Option<f64>,
    /// PM2.5 in µg/m³
    pub pm25: Option<f64>,
    /// CO₂ in ppm
    pub co2: Option<f64>,
    /// Current status
    pub status: Option<SensorStatus>,
}

impl AirSensorInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("name", self.name.as_ref());
        checker.text("mfy", self.mfy.as_ref());
        check_point(&mut checker, "location", self.location.as_ref());
        for (field, value) in [("aqi", self.aqi), ("pm25", self.pm25), ("co2", self.co2)] {
            checker.required(field, value.as_ref());
            checker.float_range(field, value, 0.0, f64::MAX);
        }
        checker.required("status", self.status.as_ref());
        checker.finish()
    }
}

async fn find_air_sensor<C: ConnectionTrait>(db: &C, scope: Scope, id: Uuid) -> Result<AirSensorModel> {
    let sensor = AirSensor::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("AirSensor", id))?;
    scope.ensure(sensor.organization_id)?;
    Ok(sensor)
}

/// Air sensor resource
pub struct AirSensors;

impl Resource for AirSensors {
    const NAME: &'static str = "air-sensors";
    type Input = AirSensorInput;
    type View = Located<AirSensorModel>;

    async fn list(db: &DatabaseConnection, scope: Scope) -> Result<Vec<Self::View>> {
        let sensors = AirSensor::find()
            .filter(scope.condition(AirSensorColumn::OrganizationId))
            .order_by_asc(AirSensorColumn::Name)
            .all(db)
            .await?;
        geo::attach_locations(db, sensors, |s| s.location_id).await
    }

    async fn retrieve(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<Self::View> {
        let sensor = find_air_sensor(db, scope, id).await?;
        let location_id = sensor.location_id;
        geo::attach_location(db, sensor, location_id).await
    }

    async fn create(db: &DatabaseConnection, scope: Scope, input: AirSensorInput) -> Result<Self::View> {
        input.validate(WriteMode::Create)?;
        let (Some(name), Some(mfy), Some(location), Some(aqi), Some(pm25), Some(co2), Some(status)) = (
            input.name,
            input.mfy,
            input.location,
            input.aqi,
            input.pm25,
            input.co2,
            input.status,
        ) else {
            return Err(Error::field("name", REQUIRED));
        };
        let txn = db.begin().await?;
        let owner = organization::owner_for_create(&txn, scope, input.organization).await?;
        let location = geo::insert_coordinate(&txn, location).await?;
        let sensor = air_sensor::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(owner),
            name: Set(name.trim().to_string()),
            mfy: Set(mfy),
            location_id: Set(location.id),
            aqi: Set(aqi),
            pm25: Set(pm25),
            co2: Set(co2),
            status: Set(status),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        info!(sensor = %sensor.name, "Created air sensor");
        Ok(Located {
            item: sensor,
            location: Some(location),
        })
    }

    async fn update(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
        input: AirSensorInput,
        mode: WriteMode,
    ) -> Result<Self::View> {
        input.validate(mode)?;
        let txn = db.begin().await?;
        let existing = find_air_sensor(&txn, scope, id).await?;
        let owner =
            organization::owner_for_update(&txn, scope, existing.organization_id, input.organization).await?;
        if let Some(location) = input.location {
            geo::move_coordinate(&txn, existing.location_id, location).await?;
        }
        let location_id = existing.location_id;
        let mut active: air_sensor::ActiveModel = existing.into();
        active.organization_id = Set(owner);
        assign(&mut active.name, input.name.map(|n| n.trim().to_string()));
        assign(&mut active.mfy, input.mfy);
        assign(&mut active.aqi, input.aqi);
        assign(&mut active.pm25, input.pm25);
        assign(&mut active.co2, input.co2);
        assign(&mut active.status, input.status);
        let sensor = active.update(&txn).await?;
        let view = geo::attach_location(&txn, sensor, location_id).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn delete(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<()> {
        let txn = db.begin().await?;
        let sensor = find_air_sensor(&txn, scope, id).await?;
        AirSensor::delete_by_id(id).exec(&txn).await?;
        geo::delete_coordinates(&txn, [sensor.location_id]).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// Air sensors in one status.
pub async fn air_sensors_by_status(
    db: &DatabaseConnection,
    scope: Scope,
    status: SensorStatus,
) -> Result<Vec<Located<AirSensorModel>>> {
    let sensors = AirSensor::find()
        .filter(scope.condition(AirSensorColumn::OrganizationId))
        .filter(AirSensorColumn::Status.eq(status))
        .order_by_asc(AirSensorColumn::Name)
        .all(db)
        .await?;
    geo::attach_locations(db, sensors, |s| s.location_id).await
}

/// Eco violation write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EcoViolationInput {
    /// Owning organization id
    pub organization: Option<Uuid>,
    /// Human-readable place name
    pub location_name: Option<String>,
    /// Neighbourhood (MFY) name
    pub mfy: Option<String>,
    /// When the violation was recorded
    pub timestamp: Option<DateTime<Utc>>,
    /// Image URL
    pub image_url: Option<String>,
    /// Detection confidence
    pub confidence: Option<f64>,
    /// Identified offender, if any
    pub offender_name: Option<String>,
    /// Face-recognition id
    pub face_id: Option<String>,
    /// Cropped face image URL
    pub face_image_url: Option<String>,
    /// Face match score
    pub match_score: Option<f64>,
    /// Estimated offender age
    pub estimated_age: Option<i32>,
    /// Estimated offender gender
    pub gender: Option<Gender>,
}

impl EcoViolationInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("location_name", self.location_name.as_ref());
        checker.text("mfy", self.mfy.as_ref());
        checker.required("timestamp", self.timestamp.as_ref());
        checker.text("image_url", self.image_url.as_ref());
        checker.required("confidence", self.confidence.as_ref());
        checker.float_range("confidence", self.confidence, 0.0, 100.0);
        checker.float_range("match_score", self.match_score, 0.0, 100.0);
        checker.int_range("estimated_age", self.estimated_age, 0, 150);
        checker.finish()
    }
}

async fn find_violation<C: ConnectionTrait>(db: &C, scope: Scope, id: Uuid) -> Result<EcoViolationModel> {
    let violation = EcoViolation::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("EcoViolation", id))?;
    scope.ensure(violation.organization_id)?;
    Ok(violation)
}

/// Eco violation resource
pub struct EcoViolations;

impl Resource for EcoViolations {
    const NAME: &'static str = "eco-violations";
    type Input = EcoViolationInput;
    type View = EcoViolationModel;

    async fn list(db: &DatabaseConnection, scope: Scope) -> Result<Vec<EcoViolationModel>> {
        Ok(EcoViolation::find()
            .filter(scope.condition(EcoViolationColumn::OrganizationId))
            .order_by_desc(EcoViolationColumn::Timestamp)
            .all(db)
            .await?)
    }

    async fn retrieve(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<EcoViolationModel> {
        find_violation(db, scope, id).await
    }

    async fn create(db: &DatabaseConnection, scope: Scope, input: EcoViolationInput) -> Result<EcoViolationModel> {
        input.validate(WriteMode::Create)?;
        let (Some(location_name), Some(mfy), Some(timestamp), Some(image_url), Some(confidence)) = (
            input.location_name,
            input.mfy,
            input.timestamp,
            input.image_url,
            input.confidence,
        ) else {
            return Err(Error::field("location_name", REQUIRED));
        };
        let owner = organization::owner_for_create(db, scope, input.organization).await?;
        let violation = eco_violation::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(owner),
            location_name: Set(location_name),
            mfy: Set(mfy),
            timestamp: Set(timestamp),
            image_url: Set(image_url),
            confidence: Set(confidence),
            offender_name: Set(input.offender_name),
            face_id: Set(input.face_id),
            face_image_url: Set(input.face_image_url),
            match_score: Set(input.match_score),
            estimated_age: Set(input.estimated_age),
            gender: Set(input.gender),
        }
        .insert(db)
        .await?;
        info!(location = %violation.location_name, "Recorded eco violation");
        Ok(violation)
    }

    async fn update(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
        input: EcoViolationInput,
        mode: WriteMode,
    ) -> Result<EcoViolationModel> {
        input.validate(mode)?;
        let existing = find_violation(db, scope, id).await?;
        let owner =
            organization::owner_for_update(db, scope, existing.organization_id, input.organization).await?;
        let mut active: eco_violation::ActiveModel = existing.into();
        active.organization_id = Set(owner);
        assign(&mut active.location_name, input.location_name);
        assign(&mut active.mfy, input.mfy);
        assign(&mut active.timestamp, input.timestamp);
        assign(&mut active.image_url, input.image_url);
        assign(&mut active.confidence, input.confidence);
        assign_opt(&mut active.offender_name, input.offender_name);
        assign_opt(&mut active.face_id, input.face_id);
        assign_opt(&mut active.face_image_url, input.face_image_url);
        assign_opt(&mut active.match_score, input.match_score);
        assign_opt(&mut active.estimated_age, input.estimated_age);
        assign_opt(&mut active.gender, input.gender);
        Ok(active.update(db).await?)
    }

    async fn delete(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<()> {
        find_violation(db, scope, id).await?;
        EcoViolation::delete_by_id(id).exec(db).await?;
        Ok(())
    }
}

/// Violations recorded between two dates, both days inclusive.
///
/// Either bound may be omitted.
pub async fn violations_between(
    db: &DatabaseConnection,
    scope: Scope,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<EcoViolationModel>> {
    let mut query = EcoViolation::find().filter(scope.condition(EcoViolationColumn::OrganizationId));
    if let Some(start) = start {
        let from = start.and_time(chrono::NaiveTime::MIN).and_utc();
        query = query.filter(EcoViolationColumn::Timestamp.gte(from));
    }
    if let Some(end) = end {
        let next_day = end
            .checked_add_days(Days::new(1))
            .ok_or_else(|| Error::field("end_date", "Date out of range."))?;
        let until = next_day.and_time(chrono::NaiveTime::MIN).and_utc();
        query = query.filter(EcoViolationColumn::Timestamp.lt(until));
    }
    Ok(query
        .order_by_desc(EcoViolationColumn::Timestamp)
        .all(db)
        .await?)
}

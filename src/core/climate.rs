//! Climate monitoring: soil moisture sensors, rooms, boilers and facilities.
//!
//! All of it is city-wide reference data. Boilers heat a set of rooms and
//! facilities own a set of boilers; both sets are written as id lists and a
//! present list replaces the whole set.

use super::device_health::{self, DeviceHealthInput};
use super::geo::{self, Located, Point, check_point};
use super::resource::Resource;
use super::tenant::Scope;
use super::validation::{
    Checker, REQUIRED, WriteMode, assign, assign_opt, dedup_ids, ensure_references,
};
use crate::entities::facility::FacilityType;
use crate::entities::types::{SensorStatus, Series};
use crate::entities::{
    Boiler, BoilerColumn, BoilerModel, BoilerRoom, BoilerRoomColumn, DeviceHealthModel, Facility,
    FacilityBoiler, FacilityBoilerColumn, FacilityColumn, FacilityModel, IotDevice,
    IotDeviceColumn, MoistureSensor, MoistureSensorColumn, MoistureSensorModel, Room, RoomColumn,
    RoomModel, boiler, boiler_room, facility, facility_boiler, moisture_sensor, room,
};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, LoaderTrait, QueryOrder, Set, TransactionTrait,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// Moisture sensors

/// Moisture sensor write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MoistureSensorInput {
    /// Position as `{lat, lng}`
    pub location: Option<Point>,
    /// Neighbourhood (MFY) name
    pub mfy: Option<String>,
    /// Current status
    pub status: Option<SensorStatus>,
    /// Soil moisture in %
    pub moisture_level: Option<f64>,
    /// Defaults to now
    pub last_update: Option<DateTime<Utc>>,
}

impl MoistureSensorInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        check_point(&mut checker, "location", self.location.as_ref());
        checker.text("mfy", self.mfy.as_ref());
        checker.required("status", self.status.as_ref());
        checker.required("moisture_level", self.moisture_level.as_ref());
        checker.float_range("moisture_level", self.moisture_level, 0.0, 100.0);
        checker.finish()
    }
}

/// Moisture sensor resource
pub struct MoistureSensors;

async fn find_moisture_sensor<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<MoistureSensorModel> {
    MoistureSensor::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("MoistureSensor", id))
}

impl Resource for MoistureSensors {
    const NAME: &'static str = "moisture-sensors";
    type Input = MoistureSensorInput;
    type View = Located<MoistureSensorModel>;

    async fn list(db: &DatabaseConnection, _scope: Scope) -> Result<Vec<Self::View>> {
        let sensors = MoistureSensor::find()
            .order_by_asc(MoistureSensorColumn::Mfy)
            .all(db)
            .await?;
        geo::attach_locations(db, sensors, |s| s.location_id).await
    }

    async fn retrieve(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<Self::View> {
        let sensor = find_moisture_sensor(db, id).await?;
        let location_id = sensor.location_id;
        geo::attach_location(db, sensor, location_id).await
    }

    async fn create(db: &DatabaseConnection, _scope: Scope, input: MoistureSensorInput) -> Result<Self::View> {
        input.validate(WriteMode::Create)?;
        let (Some(location), Some(mfy), Some(status), Some(moisture_level)) =
            (input.location, input.mfy, input.status, input.moisture_level)
        else {
            return Err(Error::field("location", REQUIRED));
        };
        let txn = db.begin().await?;
        let location = geo::insert_coordinate(&txn, location).await?;
        let sensor = moisture_sensor::ActiveModel {
            id: Set(Uuid::new_v4()),
            location_id: Set(location.id),
            mfy: Set(mfy),
            status: Set(status),
            moisture_level: Set(moisture_level),
            last_update: Set(input.last_update.unwrap_or_else(Utc::now)),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(Located {
            item: sensor,
            location: Some(location),
        })
    }

    async fn update(
        db: &DatabaseConnection,
        _scope: Scope,
        id: Uuid,
        input: MoistureSensorInput,
        mode: WriteMode,
    ) -> Result<Self::View> {
        input.validate(mode)?;
        let txn = db.begin().await?;
        let existing = find_moisture_sensor(&txn, id).await?;
        if let Some(location) = input.location {
            geo::move_coordinate(&txn, existing.location_id, location).await?;
        }
        let location_id = existing.location_id;
        let mut active: moisture_sensor::ActiveModel = existing.into();
        assign(&mut active.mfy, input.mfy);
        assign(&mut active.status, input.status);
        assign(&mut active.moisture_level, input.moisture_level);
        assign(&mut active.last_update, input.last_update);
        let sensor = active.update(&txn).await?;
        let view = geo::attach_location(&txn, sensor, location_id).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn delete(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<()> {
        let txn = db.begin().await?;
        let sensor = find_moisture_sensor(&txn, id).await?;
        MoistureSensor::delete_by_id(id).exec(&txn).await?;
        geo::delete_coordinates(&txn, [sensor.location_id]).await?;
        txn.commit().await?;
        Ok(())
    }
}

// Rooms

/// Room write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoomInput {
    /// Display name
    pub name: Option<String>,
    /// Humidity the room should hold
    pub target_humidity: Option<f64>,
    /// Relative humidity in %
    pub humidity: Option<f64>,
    /// Temperature in °C
    pub temperature: Option<f64>,
    /// Current status
    pub status: Option<SensorStatus>,
    /// Recent readings, oldest first
    pub trend: Option<Vec<f64>>,
    /// Time of the last reading
    pub last_updated: Option<DateTime<Utc>>,
}

impl RoomInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("name", self.name.as_ref());
        checker.required("target_humidity", self.target_humidity.as_ref());
        checker.float_range("target_humidity", self.target_humidity, 0.0, 100.0);
        checker.required("humidity", self.humidity.as_ref());
        checker.float_range("humidity", self.humidity, 0.0, 100.0);
        checker.finite("temperature", self.temperature);
        checker.required("status", self.status.as_ref());
        checker.finish()
    }
}

async fn find_room<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<RoomModel> {
    Room::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Room", id))
}

/// Room resource
pub struct Rooms;

impl Resource for Rooms {
    const NAME: &'static str = "rooms";
    type Input = RoomInput;
    type View = RoomModel;

    async fn list(db: &DatabaseConnection, _scope: Scope) -> Result<Vec<RoomModel>> {
        Ok(Room::find().order_by_asc(RoomColumn::Name).all(db).await?)
    }

    async fn retrieve(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<RoomModel> {
        find_room(db, id).await
    }

    async fn create(db: &DatabaseConnection, _scope: Scope, input: RoomInput) -> Result<RoomModel> {
        input.validate(WriteMode::Create)?;
        let (Some(name), Some(target_humidity), Some(humidity), Some(status)) =
            (input.name, input.target_humidity, input.humidity, input.status)
        else {
            return Err(Error::field("name", REQUIRED));
        };
        let room = room::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.trim().to_string()),
            target_humidity: Set(target_humidity),
            humidity: Set(humidity),
            temperature: Set(input.temperature),
            status: Set(status),
            trend: Set(Series(input.trend.unwrap_or_default())),
            last_updated: Set(input.last_updated),
        }
        .insert(db)
        .await?;
        Ok(room)
    }

    async fn update(
        db: &DatabaseConnection,
        _scope: Scope,
        id: Uuid,
        input: RoomInput,
        mode: WriteMode,
    ) -> Result<RoomModel> {
        input.validate(mode)?;
        let mut active: room::ActiveModel = find_room(db, id).await?.into();
        assign(&mut active.name, input.name.map(|n| n.trim().to_string()));
        assign(&mut active.target_humidity, input.target_humidity);
        assign(&mut active.humidity, input.humidity);
        assign_opt(&mut active.temperature, input.temperature);
        assign(&mut active.status, input.status);
        assign(&mut active.trend, input.trend.map(Series));
        assign_opt(&mut active.last_updated, input.last_updated);
        Ok(active.update(db).await?)
    }

    async fn delete(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<()> {
        let txn = db.begin().await?;
        find_room(&txn, id).await?;
        IotDevice::update_many()
            .col_expr(IotDeviceColumn::RoomId, Expr::value(Option::<Uuid>::None))
            .filter(IotDeviceColumn::RoomId.eq(id))
            .exec(&txn)
            .await?;
        BoilerRoom::delete_many()
            .filter(BoilerRoomColumn::RoomId.eq(id))
            .exec(&txn)
            .await?;
        Room::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

// Boilers

/// Boiler read representation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoilerView {
    /// The boiler row
    #[serde(flatten)]
    pub item: BoilerModel,
    /// Owned health record
    pub device_health: Option<DeviceHealthModel>,
    /// Rooms heated by this boiler
    pub connected_rooms: Vec<RoomModel>,
}

/// Boiler write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BoilerInput {
    /// Display name
    pub name: Option<String>,
    /// Humidity the room should hold
    pub target_humidity: Option<f64>,
    /// Relative humidity in %
    pub humidity: Option<f64>,
    /// Temperature in °C
    pub temperature: Option<f64>,
    /// Current status
    pub status: Option<SensorStatus>,
    /// Recent readings, oldest first
    pub trend: Option<Vec<f64>>,
    /// Time of the last reading
    pub last_updated: Option<DateTime<Utc>>,
    /// Battery and signal state
    pub device_health: Option<DeviceHealthInput>,
    /// Room ids; replaces the set when present
    pub connected_rooms: Option<Vec<Uuid>>,
}

impl BoilerInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("name", self.name.as_ref());
        checker.required("target_humidity", self.target_humidity.as_ref());
        checker.float_range("target_humidity", self.target_humidity, 0.0, 100.0);
        checker.required("humidity", self.humidity.as_ref());
        checker.float_range("humidity", self.humidity, 0.0, 100.0);
        checker.finite("temperature", self.temperature);
        checker.required("status", self.status.as_ref());
        device_health::check(&mut checker, "device_health", self.device_health.as_ref());
        checker.finish()
    }
}

async fn find_boiler<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<BoilerModel> {
    Boiler::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Boiler", id))
}

/// Builds boiler views with their health rows and rooms, preserving order.
pub async fn boiler_views<C: ConnectionTrait>(db: &C, boilers: Vec<BoilerModel>) -> Result<Vec<BoilerView>> {
    let rooms = boilers.load_many_to_many(Room, BoilerRoom, db).await?;
    let mut health = device_health::load_map(db, boilers.iter().map(|b| b.device_health_id)).await?;
    Ok(boilers
        .into_iter()
        .zip(rooms)
        .map(|(item, mut connected_rooms)| {
            connected_rooms.sort_by(|a, b| a.name.cmp(&b.name));
            BoilerView {
                device_health: health.remove(&item.device_health_id),
                connected_rooms,
                item,
            }
        })
        .collect())
}

async fn boiler_view<C: ConnectionTrait>(db: &C, boiler: BoilerModel) -> Result<BoilerView> {
    boiler_views(db, vec![boiler])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("Boiler", "view"))
}

/// Replaces the rooms a boiler heats.
async fn replace_rooms<C: ConnectionTrait>(db: &C, boiler_id: Uuid, room_ids: Vec<Uuid>) -> Result<()> {
    let room_ids = dedup_ids(room_ids);
    ensure_references::<Room, _>(db, "connected_rooms", &room_ids).await?;
    BoilerRoom::delete_many()
        .filter(BoilerRoomColumn::BoilerId.eq(boiler_id))
        .exec(db)
        .await?;
    if room_ids.is_empty() {
        return Ok(());
    }
    BoilerRoom::insert_many(room_ids.into_iter().map(|room_id| boiler_room::ActiveModel {
        boiler_id: Set(boiler_id),
        room_id: Set(room_id),
    }))
    .exec_without_returning(db)
    .await?;
    Ok(())
}

/// Boiler resource
pub struct Boilers;

impl Resource for Boilers {
    const NAME: &'static str = "boilers";
    type Input = BoilerInput;
    type View = BoilerView;

    async fn list(db: &DatabaseConnection, _scope: Scope) -> Result<Vec<BoilerView>> {
        let boilers = Boiler::find().order_by_asc(BoilerColumn::Name).all(db).await?;
        boiler_views(db, boilers).await
    }

    async fn retrieve(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<BoilerView> {
        let boiler = find_boiler(db, id).await?;
        boiler_view(db, boiler).await
    }

    async fn create(db: &DatabaseConnection, _scope: Scope, input: BoilerInput) -> Result<BoilerView> {
        input.validate(WriteMode::Create)?;
        let (Some(name), Some(target_humidity), Some(humidity), Some(status), Some(health)) = (
            input.name,
            input.target_humidity,
            input.humidity,
            input.status,
            input.device_health,
        ) else {
            return Err(Error::field("name", REQUIRED));
        };
        let txn = db.begin().await?;
        let health = device_health::insert(&txn, health).await?;
        let boiler = boiler::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.trim().to_string()),
            target_humidity: Set(target_humidity),
            humidity: Set(humidity),
            temperature: Set(input.temperature),
            status: Set(status),
            trend: Set(Series(input.trend.unwrap_or_default())),
            last_updated: Set(input.last_updated),
            device_health_id: Set(health.id),
        }
        .insert(&txn)
        .await?;
        replace_rooms(&txn, boiler.id, input.connected_rooms.unwrap_or_default()).await?;
        let view = boiler_view(&txn, boiler).await?;
        txn.commit().await?;
        info!(boiler = %view.item.name, rooms = view.connected_rooms.len(), "Created boiler");
        Ok(view)
    }

    async fn update(
        db: &DatabaseConnection,
        _scope: Scope,
        id: Uuid,
        input: BoilerInput,
        mode: WriteMode,
    ) -> Result<BoilerView> {
        input.validate(mode)?;
        let txn = db.begin().await?;
        let existing = find_boiler(&txn, id).await?;
        if let Some(health) = input.device_health {
            device_health::update(&txn, existing.device_health_id, health).await?;
        }
        if let Some(room_ids) = input.connected_rooms {
            replace_rooms(&txn, id, room_ids).await?;
        }
        let mut active: boiler::ActiveModel = existing.into();
        assign(&mut active.name, input.name.map(|n| n.trim().to_string()));
        assign(&mut active.target_humidity, input.target_humidity);
        assign(&mut active.humidity, input.humidity);
        assign_opt(&mut active.temperature, input.temperature);
        assign(&mut active.status, input.status);
        assign(&mut active.trend, input.trend.map(Series));
        assign_opt(&mut active.last_updated, input.last_updated);
        let boiler = active.update(&txn).await?;
        let view = boiler_view(&txn, boiler).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn delete(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<()> {
        let txn = db.begin().await?;
        let boiler = find_boiler(&txn, id).await?;
        IotDevice::update_many()
            .col_expr(IotDeviceColumn::BoilerId, Expr::value(Option::<Uuid>::None))
            .filter(IotDeviceColumn::BoilerId.eq(id))
            .exec(&txn)
            .await?;
        BoilerRoom::delete_many()
            .filter(BoilerRoomColumn::BoilerId.eq(id))
            .exec(&txn)
            .await?;
        FacilityBoiler::delete_many()
            .filter(FacilityBoilerColumn::BoilerId.eq(id))
            .exec(&txn)
            .await?;
        Boiler::delete_by_id(id).exec(&txn).await?;
        device_health::delete(&txn, [boiler.device_health_id]).await?;
        txn.commit().await?;
        debug!(boiler = %boiler.name, "Deleted boiler");
        Ok(())
    }
}

// Facilities

/// Facility read representation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityView {
    /// The facility row
    #[serde(flatten)]
    pub item: FacilityModel,
    /// Boilers serving the facility
    pub boilers: Vec<BoilerView>,
}

/// Facility write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FacilityInput {
    /// Display name
    pub name: Option<String>,
    /// Facility type
    #[serde(rename = "type")]
    pub kind: Option<FacilityType>,
    /// Neighbourhood (MFY) name
    pub mfy: Option<String>,
    /// Worst status of its boilers
    pub overall_status: Option<SensorStatus>,
    /// Energy use in kWh
    pub energy_usage: Option<f64>,
    /// Efficiency score, 0 to 100
    pub efficiency_score: Option<f64>,
    /// Facility manager
    pub manager_name: Option<String>,
    /// Last maintenance date
    pub last_maintenance: Option<DateTime<Utc>>,
    /// Recent energy readings
    pub history: Option<Vec<f64>>,
    /// Boiler ids; replaces the set when present
    pub boilers: Option<Vec<Uuid>>,
}

impl FacilityInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("name", self.name.as_ref());
        checker.required("type", self.kind.as_ref());
        checker.text("mfy", self.mfy.as_ref());
        checker.required("overall_status", self.overall_status.as_ref());
        checker.required("energy_usage", self.energy_usage.as_ref());
        checker.finite("energy_usage", self.energy_usage);
        checker.required("efficiency_score", self.efficiency_score.as_ref());
        checker.finite("efficiency_score", self.efficiency_score);
        checker.text("manager_name", self.manager_name.as_ref());
        checker.required("last_maintenance", self.last_maintenance.as_ref());
        checker.finish()
    }
}

async fn find_facility<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<FacilityModel> {
    Facility::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Facility", id))
}

async fn facility_views<C: ConnectionTrait>(db: &C, facilities: Vec<FacilityModel>) -> Result<Vec<FacilityView>> {
    let boiler_sets = facilities.load_many_to_many(Boiler, FacilityBoiler, db).await?;
    let mut views = Vec::with_capacity(facilities.len());
    for (item, mut boilers) in facilities.into_iter().zip(boiler_sets) {
        boilers.sort_by(|a, b| a.name.cmp(&b.name));
        views.push(FacilityView {
            item,
            boilers: boiler_views(db, boilers).await?,
        });
    }
    Ok(views)
}

async fn facility_view<C: ConnectionTrait>(db: &C, facility: FacilityModel) -> Result<FacilityView> {
    facility_views(db, vec![facility])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("Facility", "view"))
}

async fn replace_boilers<C: ConnectionTrait>(db: &C, facility_id: Uuid, boiler_ids: Vec<Uuid>) -> Result<()> {
    let boiler_ids = dedup_ids(boiler_ids);
    ensure_references::<Boiler, _>(db, "boilers", &boiler_ids).await?;
    FacilityBoiler::delete_many()
        .filter(FacilityBoilerColumn::FacilityId.eq(facility_id))
        .exec(db)
        .await?;
    if boiler_ids.is_empty() {
        return Ok(());
    }
    FacilityBoiler::insert_many(boiler_ids.into_iter().map(|boiler_id| {
        facility_boiler::ActiveModel {
            facility_id: Set(facility_id),
            boiler_id: Set(boiler_id),
        }
    }))
    .exec_without_returning(db)
    .await?;
    Ok(())
}

/// Facility resource
pub struct Facilities;

impl Resource for Facilities {
    const NAME: &'static str = "facilities";
    type Input = FacilityInput;
    type View = FacilityView;

    async fn list(db: &DatabaseConnection, _scope: Scope) -> Result<Vec<FacilityView>> {
        let facilities = Facility::find()
            .order_by_asc(FacilityColumn::Name)
            .all(db)
            .await?;
        facility_views(db, facilities).await
    }

    async fn retrieve(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<FacilityView> {
        let facility = find_facility(db, id).await?;
        facility_view(db, facility).await
    }

    async fn create(db: &DatabaseConnection, _scope: Scope, input: FacilityInput) -> Result<FacilityView> {
        input.validate(WriteMode::Create)?;
        let (
            Some(name),
            Some(kind),
            Some(mfy),
            Some(overall_status),
            Some(energy_usage),
            Some(efficiency_score),
            Some(manager_name),
            Some(last_maintenance),
        ) = (
            input.name,
            input.kind,
            input.mfy,
            input.overall_status,
            input.energy_usage,
            input.efficiency_score,
            input.manager_name,
            input.last_maintenance,
        )
        else {
            return Err(Error::field("name", REQUIRED));
        };
        let txn = db.begin().await?;
        let facility = facility::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.trim().to_string()),
            kind: Set(kind),
            mfy: Set(mfy),
            overall_status: Set(overall_status),
            energy_usage: Set(energy_usage),
            efficiency_score: Set(efficiency_score),
            manager_name: Set(manager_name),
            last_maintenance: Set(last_maintenance),
            history: Set(Series(input.history.unwrap_or_default())),
        }
        .insert(&txn)
        .await?;
        replace_boilers(&txn, facility.id, input.boilers.unwrap_or_default()).await?;
        let view = facility_view(&txn, facility).await?;
        txn.commit().await?;
        info!(facility = %view.item.name, "Created facility");
        Ok(view)
    }

    async fn update(
        db: &DatabaseConnection,
        _scope: Scope,
        id: Uuid,
        input: FacilityInput,
        mode: WriteMode,
    ) -> Result<FacilityView> {
        input.validate(mode)?;
        let txn = db.begin().await?;
        let existing = find_facility(&txn, id).await?;
        if let Some(boiler_ids) = input.boilers {
            replace_boilers(&txn, id, boiler_ids).await?;
        }
        let mut active: facility::ActiveModel = existing.into();
        assign(&mut active.name, input.name.map(|n| n.trim().to_string()));
        assign(&mut active.kind, input.kind);
        assign(&mut active.mfy, input.mfy);
        assign(&mut active.overall_status, input.overall_status);
        assign(&mut active.energy_usage, input.energy_usage);
        assign(&mut active.efficiency_score, input.efficiency_score);
        assign(&mut active.manager_name, input.manager_name);
        assign(&mut active.last_maintenance, input.last_maintenance);
        assign(&mut active.history, input.history.map(Series));
        let facility = active.update(&txn).await?;
        let view = facility_view(&txn, facility).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn delete(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<()> {
        let txn = db.begin().await?;
        find_facility(&txn, id).await?;
        FacilityBoiler::delete_many()
            .filter(FacilityBoilerColumn::FacilityId.eq(id))
            .exec(&txn)
            .await?;
        Facility::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// Facilities of one kind.
pub async fn facilities_by_type(db: &DatabaseConnection, kind: FacilityType) -> Result<Vec<FacilityView>> {
    let facilities = Facility::find()
        .filter(FacilityColumn::Kind.eq(kind))
        .order_by_asc(FacilityColumn::Name)
        .all(db)
        .await?;
    facility_views(db, facilities).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::{Coordinate, DeviceHealth};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_moisture_sensor_owns_location() -> Result<()> {
        let db = setup_test_db().await?;
        let sensor = MoistureSensors::create(
            &db,
            Scope::All,
            MoistureSensorInput {
                location: Some(Point::new(40.38, 71.78)),
                mfy: Some("Navbahor MFY".into()),
                status: Some(SensorStatus::Optimal),
                moisture_level: Some(42.5),
                last_update: None,
            },
        )
        .await?;
        let location = sensor.location.unwrap();

        MoistureSensors::delete(&db, Scope::All, sensor.item.id).await?;
        assert!(Coordinate::find_by_id(location.id).one(&db).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_room_patch_keeps_other_fields() -> Result<()> {
        let db = setup_test_db().await?;
        let room = create_test_room(&db, "Xona 101").await?;

        let updated = Rooms::update(
            &db,
            Scope::All,
            room.id,
            RoomInput {
                humidity: Some(55.0),
                ..Default::default()
            },
            WriteMode::Patch,
        )
        .await?;
        assert_eq!(updated.humidity, 55.0);
        assert_eq!(updated.name, "Xona 101");
        assert_eq!(updated.trend, room.trend);
        Ok(())
    }

    #[tokio::test]
    async fn test_boiler_embeds_health_and_rooms() -> Result<()> {
        let db = setup_test_db().await?;
        let r1 = create_test_room(&db, "Xona 101").await?;
        let r2 = create_test_room(&db, "Xona 102").await?;

        let boiler = create_test_boiler(&db, "Maktab 1 Qozonxonasi", vec![r2.id, r1.id, r2.id]).await?;
        let names: Vec<_> = boiler.connected_rooms.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Xona 101", "Xona 102"]);
        assert!(boiler.device_health.is_some());

        let json = serde_json::to_value(&boiler).unwrap();
        assert!(json.get("device_health_id").is_none());
        assert!(json["device_health"]["is_online"].as_bool().unwrap());
        Ok(())
    }

    #[tokio::test]
    async fn test_boiler_room_set_is_replaced() -> Result<()> {
        let db = setup_test_db().await?;
        let r1 = create_test_room(&db, "Xona 101").await?;
        let r2 = create_test_room(&db, "Xona 102").await?;
        let boiler = create_test_boiler(&db, "Qozonxona", vec![r1.id]).await?;

        let updated = Boilers::update(
            &db,
            Scope::All,
            boiler.item.id,
            BoilerInput {
                connected_rooms: Some(vec![r2.id]),
                ..Default::default()
            },
            WriteMode::Patch,
        )
        .await?;
        assert_eq!(updated.connected_rooms.len(), 1);
        assert_eq!(updated.connected_rooms[0].id, r2.id);

        // Absent list leaves the set alone
        let updated = Boilers::update(
            &db,
            Scope::All,
            boiler.item.id,
            BoilerInput {
                name: Some("Yangi nom".into()),
                ..Default::default()
            },
            WriteMode::Patch,
        )
        .await?;
        assert_eq!(updated.connected_rooms.len(), 1);

        let result = Boilers::update(
            &db,
            Scope::All,
            boiler.item.id,
            BoilerInput {
                connected_rooms: Some(vec![Uuid::new_v4()]),
                ..Default::default()
            },
            WriteMode::Patch,
        )
        .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_boiler_removes_health_keeps_rooms() -> Result<()> {
        let db = setup_test_db().await?;
        let room = create_test_room(&db, "Xona 101").await?;
        let boiler = create_test_boiler(&db, "Qozonxona", vec![room.id]).await?;
        let health_id = boiler.item.device_health_id;

        Boilers::delete(&db, Scope::All, boiler.item.id).await?;

        assert!(DeviceHealth::find_by_id(health_id).one(&db).await?.is_none());
        assert!(Room::find_by_id(room.id).one(&db).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_facility_with_boilers_and_type_filter() -> Result<()> {
        let db = setup_test_db().await?;
        let room = create_test_room(&db, "Xona 101").await?;
        let boiler = create_test_boiler(&db, "Qozonxona", vec![room.id]).await?;

        let facility = Facilities::create(
            &db,
            Scope::All,
            FacilityInput {
                name: Some("1-sonli Maktab".into()),
                kind: Some(FacilityType::School),
                mfy: Some("Navbahor MFY".into()),
                overall_status: Some(SensorStatus::Optimal),
                energy_usage: Some(120.0),
                efficiency_score: Some(87.5),
                manager_name: Some("Karimov A.".into()),
                last_maintenance: Some(Utc::now()),
                history: Some(vec![75.0, 76.0, 74.0]),
                boilers: Some(vec![boiler.item.id]),
            },
        )
        .await?;
        assert_eq!(facility.boilers.len(), 1);
        assert_eq!(facility.boilers[0].connected_rooms[0].id, room.id);

        let json = serde_json::to_value(&facility).unwrap();
        assert_eq!(json["type"], "SCHOOL");
        assert_eq!(json["history"], serde_json::json!([75.0, 76.0, 74.0]));

        assert_eq!(facilities_by_type(&db, FacilityType::School).await?.len(), 1);
        assert!(facilities_by_type(&db, FacilityType::Hospital).await?.is_empty());
        Ok(())
    }
}

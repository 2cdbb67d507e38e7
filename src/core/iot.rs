//! IoT temperature/humidity devices and their readings.
//!
//! A device reports into the room or the boiler it is linked to, never both.
//! Readings arrive over HTTP (or from the sensor simulation) and overwrite the
//! device's current values together with the linked room's or boiler's.

use super::geo::{self, Located, Point, check_point};
use super::resource::Resource;
use super::tenant::Scope;
use super::validation::{Checker, REQUIRED, WriteMode, assign, assign_opt, missing_reference};
use crate::entities::iot_device::DeviceType;
use crate::entities::{
    Boiler, BoilerModel, IotDevice, IotDeviceColumn, IotDeviceModel, Room, RoomModel, boiler,
    iot_device, room,
};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*,
};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Center of the area provisioned devices are scattered around
const PROVISION_CENTER: Point = Point::new(40.3853, 71.7797);
/// Maximum offset from the center, in degrees
const PROVISION_SPREAD: f64 = 0.01;

/// IoT device write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IotDeviceInput {
    /// External device identifier, unique
    pub device_id: Option<String>,
    /// Sensor kind
    pub device_type: Option<DeviceType>,
    /// Room to report into; clears `boiler`
    pub room: Option<Uuid>,
    /// Boiler to report into; clears `room`
    pub boiler: Option<Uuid>,
    /// Where the device is mounted
    pub location: Option<Point>,
    /// Inactive devices are skipped by the simulation
    pub is_active: Option<bool>,
    /// Sleep between readings
    pub sleep_seconds: Option<i32>,
}

impl IotDeviceInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("device_id", self.device_id.as_ref());
        if self.room.is_some() && self.boiler.is_some() {
            checker.add("boiler", "A device cannot be linked to both a room and a boiler.");
        }
        if self.location.is_some() {
            check_point(&mut checker, "location", self.location.as_ref());
        }
        if self.sleep_seconds.is_some_and(|s| s < 0) {
            checker.add("sleep_seconds", "Ensure this value is greater than or equal to 0.");
        }
        checker.finish()
    }
}

async fn find_device<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<IotDeviceModel> {
    IotDevice::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("IotDevice", id))
}

async fn ensure_unique_device_id<C: ConnectionTrait>(db: &C, device_id: &str, except: Option<Uuid>) -> Result<()> {
    let mut query = IotDevice::find().filter(IotDeviceColumn::DeviceId.eq(device_id));
    if let Some(id) = except {
        query = query.filter(IotDeviceColumn::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(Error::field("device_id", "IoT device with this device id already exists."));
    }
    Ok(())
}

async fn ensure_room<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<RoomModel> {
    Room::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| missing_reference("room", id))
}

async fn ensure_boiler<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<BoilerModel> {
    Boiler::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| missing_reference("boiler", id))
}

async fn device_views<C: ConnectionTrait>(db: &C, devices: Vec<IotDeviceModel>) -> Result<Vec<Located<IotDeviceModel>>> {
    let mut locations = geo::coordinate_map(db, devices.iter().filter_map(|d| d.location_id)).await?;
    Ok(devices
        .into_iter()
        .map(|item| Located {
            location: item.location_id.and_then(|id| locations.remove(&id)),
            item,
        })
        .collect())
}

async fn device_view<C: ConnectionTrait>(db: &C, device: IotDeviceModel) -> Result<Located<IotDeviceModel>> {
    let location = match device.location_id {
        Some(id) => geo::find_coordinate(db, id).await?,
        None => None,
    };
    Ok(Located { item: device, location })
}

/// IoT device resource
pub struct IotDevices;

impl Resource for IotDevices {
    const NAME: &'static str = "iot-devices";
    type Input = IotDeviceInput;
    type View = Located<IotDeviceModel>;

    async fn list(db: &DatabaseConnection, _scope: Scope) -> Result<Vec<Self::View>> {
        let devices = IotDevice::find()
            .order_by_asc(IotDeviceColumn::DeviceId)
            .all(db)
            .await?;
        device_views(db, devices).await
    }

    async fn retrieve(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<Self::View> {
        let device = find_device(db, id).await?;
        device_view(db, device).await
    }

    async fn create(db: &DatabaseConnection, _scope: Scope, input: IotDeviceInput) -> Result<Self::View> {
        input.validate(WriteMode::Create)?;
        let Some(device_id) = input.device_id else {
            return Err(Error::field("device_id", REQUIRED));
        };
        let device_id = device_id.trim().to_string();
        let txn = db.begin().await?;
        ensure_unique_device_id(&txn, &device_id, None).await?;
        if let Some(room_id) = input.room {
            ensure_room(&txn, room_id).await?;
        }
        if let Some(boiler_id) = input.boiler {
            ensure_boiler(&txn, boiler_id).await?;
        }
        let location = match input.location {
            Some(point) => Some(geo::insert_coordinate(&txn, point).await?),
            None => None,
        };
        let device = iot_device::ActiveModel {
            id: Set(Uuid::new_v4()),
            device_id: Set(device_id),
            device_type: Set(input.device_type.unwrap_or_default()),
            room_id: Set(input.room),
            boiler_id: Set(input.boiler),
            location_id: Set(location.as_ref().map(|l| l.id)),
            is_active: Set(input.is_active.unwrap_or(true)),
            current_temperature: Set(None),
            current_humidity: Set(None),
            sleep_seconds: Set(input.sleep_seconds),
            last_seen: Set(None),
            reported_at: Set(None),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        info!(device_id = %device.device_id, "Registered IoT device");
        Ok(Located { item: device, location })
    }

    async fn update(
        db: &DatabaseConnection,
        _scope: Scope,
        id: Uuid,
        input: IotDeviceInput,
        mode: WriteMode,
    ) -> Result<Self::View> {
        input.validate(mode)?;
        let txn = db.begin().await?;
        let existing = find_device(&txn, id).await?;
        let device_id = input.device_id.map(|d| d.trim().to_string());
        if let Some(device_id) = device_id.as_deref() {
            ensure_unique_device_id(&txn, device_id, Some(id)).await?;
        }
        if let Some(room_id) = input.room {
            ensure_room(&txn, room_id).await?;
        }
        if let Some(boiler_id) = input.boiler {
            ensure_boiler(&txn, boiler_id).await?;
        }
        let new_location = match (input.location, existing.location_id) {
            (Some(point), Some(location_id)) => {
                geo::move_coordinate(&txn, location_id, point).await?;
                None
            }
            (Some(point), None) => Some(geo::insert_coordinate(&txn, point).await?.id),
            (None, _) => None,
        };

        let mut active: iot_device::ActiveModel = existing.into();
        assign(&mut active.device_id, device_id);
        assign(&mut active.device_type, input.device_type);
        if let Some(room_id) = input.room {
            active.room_id = Set(Some(room_id));
            active.boiler_id = Set(None);
        }
        if let Some(boiler_id) = input.boiler {
            active.boiler_id = Set(Some(boiler_id));
            active.room_id = Set(None);
        }
        assign_opt(&mut active.location_id, new_location);
        assign(&mut active.is_active, input.is_active);
        assign_opt(&mut active.sleep_seconds, input.sleep_seconds);
        let device = active.update(&txn).await?;
        let view = device_view(&txn, device).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn delete(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<()> {
        let txn = db.begin().await?;
        let device = find_device(&txn, id).await?;
        IotDevice::delete_by_id(id).exec(&txn).await?;
        geo::delete_coordinates(&txn, device.location_id).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// Links a device to a room, clearing any boiler link.
pub async fn link_to_room(db: &DatabaseConnection, id: Uuid, room_id: Uuid) -> Result<Located<IotDeviceModel>> {
    let txn = db.begin().await?;
    let device = find_device(&txn, id).await?;
    ensure_room(&txn, room_id).await?;
    let mut active: iot_device::ActiveModel = device.into();
    active.room_id = Set(Some(room_id));
    active.boiler_id = Set(None);
    let device = active.update(&txn).await?;
    let view = device_view(&txn, device).await?;
    txn.commit().await?;
    debug!(device_id = %view.item.device_id, %room_id, "Linked device to room");
    Ok(view)
}

/// Links a device to a boiler, clearing any room link.
pub async fn link_to_boiler(db: &DatabaseConnection, id: Uuid, boiler_id: Uuid) -> Result<Located<IotDeviceModel>> {
    let txn = db.begin().await?;
    let device = find_device(&txn, id).await?;
    ensure_boiler(&txn, boiler_id).await?;
    let mut active: iot_device::ActiveModel = device.into();
    active.boiler_id = Set(Some(boiler_id));
    active.room_id = Set(None);
    let device = active.update(&txn).await?;
    let view = device_view(&txn, device).await?;
    txn.commit().await?;
    debug!(device_id = %view.item.device_id, %boiler_id, "Linked device to boiler");
    Ok(view)
}

/// Clears both links.
pub async fn unlink(db: &DatabaseConnection, id: Uuid) -> Result<Located<IotDeviceModel>> {
    let device = find_device(db, id).await?;
    let mut active: iot_device::ActiveModel = device.into();
    active.room_id = Set(None);
    active.boiler_id = Set(None);
    let device = active.update(db).await?;
    device_view(db, device).await
}

/// Body of `POST /iot/update/`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReadingInput {
    /// External device identifier
    pub device_id: Option<String>,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Relative humidity in percent
    pub humidity: Option<f64>,
    /// Sleep before the next reading
    pub sleep_seconds: Option<i32>,
    /// Unix seconds at which the device took the reading
    pub timestamp: Option<i64>,
}

/// One validated sensor reading
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// External device identifier
    pub device_id: String,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity, clamped to 0..=100 on ingest
    pub humidity: f64,
    /// How long the device sleeps before the next reading
    pub sleep_seconds: Option<i32>,
    /// When the device took the reading
    pub reported_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReadingInput> for SensorReading {
    type Error = Error;

    fn try_from(input: ReadingInput) -> Result<Self> {
        let mut checker = Checker::new(WriteMode::Create);
        checker.text("device_id", input.device_id.as_ref());
        checker.required("temperature", input.temperature.as_ref());
        checker.finite("temperature", input.temperature);
        checker.required("humidity", input.humidity.as_ref());
        checker.finite("humidity", input.humidity);
        let reported_at = input.timestamp.map(|ts| DateTime::<Utc>::from_timestamp(ts, 0));
        if matches!(reported_at, Some(None)) {
            checker.add("timestamp", "Invalid unix timestamp.");
        }
        checker.finish()?;
        let (Some(device_id), Some(temperature), Some(humidity)) =
            (input.device_id, input.temperature, input.humidity)
        else {
            return Err(Error::field("device_id", REQUIRED));
        };
        Ok(Self {
            device_id,
            temperature,
            humidity,
            sleep_seconds: input.sleep_seconds,
            reported_at: reported_at.flatten(),
        })
    }
}

/// Stores a reading on the device and on the room or boiler it is linked to.
///
/// Unknown devices are `NotFound`; humidity is clamped to 0..=100.
#[instrument(skip(db, reading), fields(device_id = %reading.device_id))]
pub async fn ingest_reading(db: &DatabaseConnection, reading: SensorReading) -> Result<IotDeviceModel> {
    let humidity = reading.humidity.clamp(0.0, 100.0);
    let now = Utc::now();
    let txn = db.begin().await?;
    let device = IotDevice::find()
        .filter(IotDeviceColumn::DeviceId.eq(reading.device_id.as_str()))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("IotDevice", &reading.device_id))?;

    if let Some(room_id) = device.room_id {
        if let Some(target) = Room::find_by_id(room_id).one(&txn).await? {
            let mut active: room::ActiveModel = target.into();
            active.temperature = Set(Some(reading.temperature));
            active.humidity = Set(humidity);
            active.last_updated = Set(Some(now));
            active.update(&txn).await?;
        }
    } else if let Some(boiler_id) = device.boiler_id {
        if let Some(target) = Boiler::find_by_id(boiler_id).one(&txn).await? {
            let mut active: boiler::ActiveModel = target.into();
            active.temperature = Set(Some(reading.temperature));
            active.humidity = Set(humidity);
            active.last_updated = Set(Some(now));
            active.update(&txn).await?;
        }
    }

    let mut active: iot_device::ActiveModel = device.into();
    active.current_temperature = Set(Some(reading.temperature));
    active.current_humidity = Set(Some(humidity));
    assign_opt(&mut active.sleep_seconds, reading.sleep_seconds);
    active.last_seen = Set(Some(now));
    active.reported_at = Set(Some(reading.reported_at.unwrap_or(now)));
    let device = active.update(&txn).await?;
    txn.commit().await?;
    debug!(temperature = reading.temperature, humidity, "Stored reading");
    Ok(device)
}

/// A fresh `ESP-XXXXXXXX` identifier.
#[must_use]
pub fn generate_device_id() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("ESP-{}", &hex[..8])
}

fn provision_point() -> Point {
    let mut rng = rand::rng();
    Point::new(
        PROVISION_CENTER.lat + rng.random_range(-PROVISION_SPREAD..=PROVISION_SPREAD),
        PROVISION_CENTER.lng + rng.random_range(-PROVISION_SPREAD..=PROVISION_SPREAD),
    )
}

/// Devices created by [`associate_devices`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Provisioned {
    /// New room devices
    pub rooms: usize,
    /// New boiler devices
    pub boilers: usize,
}

/// Creates one device for every room and every boiler that has none.
pub async fn associate_devices(db: &DatabaseConnection) -> Result<Provisioned> {
    let txn = db.begin().await?;
    let devices = IotDevice::find().all(&txn).await?;
    let linked_rooms: HashSet<Uuid> = devices.iter().filter_map(|d| d.room_id).collect();
    let linked_boilers: HashSet<Uuid> = devices.iter().filter_map(|d| d.boiler_id).collect();
    let mut provisioned = Provisioned::default();

    for target in Room::find().order_by_asc(crate::entities::RoomColumn::Name).all(&txn).await? {
        if linked_rooms.contains(&target.id) {
            continue;
        }
        let device = provision(&txn, Some(target.id), None).await?;
        info!(device_id = %device.device_id, room = %target.name, "Created IoT device for room");
        provisioned.rooms += 1;
    }

    for target in Boiler::find().order_by_asc(crate::entities::BoilerColumn::Name).all(&txn).await? {
        if linked_boilers.contains(&target.id) {
            continue;
        }
        let device = provision(&txn, None, Some(target.id)).await?;
        info!(device_id = %device.device_id, boiler = %target.name, "Created IoT device for boiler");
        provisioned.boilers += 1;
    }

    txn.commit().await?;
    Ok(provisioned)
}

async fn provision<C: ConnectionTrait>(db: &C, room_id: Option<Uuid>, boiler_id: Option<Uuid>) -> Result<IotDeviceModel> {
    let location = geo::insert_coordinate(db, provision_point()).await?;
    iot_device::ActiveModel {
        id: Set(Uuid::new_v4()),
        device_id: Set(generate_device_id()),
        device_type: Set(DeviceType::Both),
        room_id: Set(room_id),
        boiler_id: Set(boiler_id),
        location_id: Set(Some(location.id)),
        is_active: Set(true),
        current_temperature: Set(None),
        current_humidity: Set(None),
        sleep_seconds: Set(None),
        last_seen: Set(None),
        reported_at: Set(None),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn reading(device_id: &str, temperature: f64, humidity: f64) -> SensorReading {
        SensorReading {
            device_id: device_id.to_string(),
            temperature,
            humidity,
            sleep_seconds: Some(2000),
            reported_at: None,
        }
    }

    #[tokio::test]
    async fn test_ingest_updates_device_and_room() -> Result<()> {
        let db = setup_test_db().await?;
        let room = create_test_room(&db, "Xona 101").await?;
        create_test_iot_device(&db, "ESP-0000AAAA", Some(room.id), None).await?;

        let device = ingest_reading(&db, reading("ESP-0000AAAA", 22.5, 140.0)).await?;
        assert_eq!(device.current_temperature, Some(22.5));
        assert_eq!(device.current_humidity, Some(100.0));
        assert_eq!(device.sleep_seconds, Some(2000));
        assert!(device.last_seen.is_some());

        let room = Room::find_by_id(room.id).one(&db).await?.unwrap();
        assert_eq!(room.temperature, Some(22.5));
        assert_eq!(room.humidity, 100.0);
        assert!(room.last_updated.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_ingest_clamps_negative_humidity_on_boiler() -> Result<()> {
        let db = setup_test_db().await?;
        let boiler = create_test_boiler(&db, "Qozonxona", vec![]).await?;
        create_test_iot_device(&db, "ESP-0000BBBB", None, Some(boiler.item.id)).await?;

        ingest_reading(&db, reading("ESP-0000BBBB", 30.0, -12.0)).await?;
        let boiler = Boiler::find_by_id(boiler.item.id).one(&db).await?.unwrap();
        assert_eq!(boiler.humidity, 0.0);
        assert_eq!(boiler.temperature, Some(30.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_ingest_unknown_device() -> Result<()> {
        let db = setup_test_db().await?;
        let result = ingest_reading(&db, reading("ESP-NOPE", 20.0, 40.0)).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[test]
    fn test_reading_input_conversion() {
        let reading = SensorReading::try_from(ReadingInput {
            device_id: Some("ESP-1".into()),
            temperature: Some(21.0),
            humidity: Some(50.0),
            sleep_seconds: None,
            timestamp: Some(1_700_000_000),
        })
        .unwrap();
        assert_eq!(reading.reported_at.unwrap().timestamp(), 1_700_000_000);

        let result = SensorReading::try_from(ReadingInput {
            device_id: Some("ESP-1".into()),
            ..Default::default()
        });
        let Err(Error::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.contains("temperature"));
        assert!(errors.contains("humidity"));
    }

    #[tokio::test]
    async fn test_linking_clears_the_other_side() -> Result<()> {
        let db = setup_test_db().await?;
        let room = create_test_room(&db, "Xona 101").await?;
        let boiler = create_test_boiler(&db, "Qozonxona", vec![]).await?;
        let device = create_test_iot_device(&db, "ESP-0000CCCC", Some(room.id), None).await?;

        let linked = link_to_boiler(&db, device.item.id, boiler.item.id).await?;
        assert_eq!(linked.item.boiler_id, Some(boiler.item.id));
        assert_eq!(linked.item.room_id, None);

        let linked = link_to_room(&db, device.item.id, room.id).await?;
        assert_eq!(linked.item.room_id, Some(room.id));
        assert_eq!(linked.item.boiler_id, None);

        let unlinked = unlink(&db, device.item.id).await?;
        assert_eq!(unlinked.item.room_id, None);
        assert_eq!(unlinked.item.boiler_id, None);

        let result = link_to_room(&db, device.item.id, Uuid::new_v4()).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_with_room_clears_boiler() -> Result<()> {
        let db = setup_test_db().await?;
        let room = create_test_room(&db, "Xona 101").await?;
        let boiler = create_test_boiler(&db, "Qozonxona", vec![]).await?;
        let device = create_test_iot_device(&db, "ESP-0000DDDD", None, Some(boiler.item.id)).await?;

        let updated = IotDevices::update(
            &db,
            Scope::All,
            device.item.id,
            IotDeviceInput {
                room: Some(room.id),
                ..Default::default()
            },
            WriteMode::Patch,
        )
        .await?;
        assert_eq!(updated.item.room_id, Some(room.id));
        assert_eq!(updated.item.boiler_id, None);

        let result = IotDevices::create(
            &db,
            Scope::All,
            IotDeviceInput {
                device_id: Some("ESP-BOTH".into()),
                room: Some(room.id),
                boiler: Some(boiler.item.id),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_device_id_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_iot_device(&db, "ESP-0000EEEE", None, None).await?;
        let result = create_test_iot_device(&db, "ESP-0000EEEE", None, None).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_associate_devices_provisions_missing_only() -> Result<()> {
        let db = setup_test_db().await?;
        let r1 = create_test_room(&db, "Xona 101").await?;
        create_test_room(&db, "Xona 102").await?;
        create_test_boiler(&db, "Qozonxona", vec![]).await?;
        create_test_iot_device(&db, "ESP-EXISTING", Some(r1.id), None).await?;

        let provisioned = associate_devices(&db).await?;
        assert_eq!(provisioned, Provisioned { rooms: 1, boilers: 1 });

        let devices = IotDevices::list(&db, Scope::All).await?;
        assert_eq!(devices.len(), 3);
        for device in devices.iter().filter(|d| d.item.device_id != "ESP-EXISTING") {
            assert!(device.item.device_id.starts_with("ESP-"));
            assert_eq!(device.item.device_id.len(), 12);
            let location = device.location.as_ref().unwrap();
            assert!((location.lat - PROVISION_CENTER.lat).abs() <= PROVISION_SPREAD + 1e-9);
        }

        // A second run finds nothing to do
        assert_eq!(associate_devices(&db).await?, Provisioned::default());
        Ok(())
    }
}

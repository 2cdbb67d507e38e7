//! Public transport: live bus telemetry.

use super::geo::{self, Located, Point, check_point};
use super::organization;
use super::resource::Resource;
use super::tenant::Scope;
use super::validation::{Checker, REQUIRED, WriteMode, assign};
use crate::entities::bus::{BusStatus, DoorStatus, FatigueLevel};
use crate::entities::{Bus, BusColumn, BusModel, bus};
use crate::errors::{Error, Result};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

/// Bus write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BusInput {
    /// Owning organization id
    pub organization: Option<Uuid>,
    /// Route served
    pub route_number: Option<String>,
    /// Licence plate
    pub plate_number: Option<String>,
    /// Driver full name
    pub driver_name: Option<String>,
    /// Position as `{lat, lng}`
    pub location: Option<Point>,
    /// Heading in degrees
    pub bearing: Option<f64>,
    /// Speed in km/h
    pub speed: Option<f64>,
    /// Engine revolutions per minute
    pub rpm: Option<f64>,
    /// Passengers on board
    pub passengers: Option<i32>,
    /// Current status
    pub status: Option<BusStatus>,
    /// Fuel percentage
    pub fuel_level: Option<f64>,
    /// Engine temperature in °C
    pub engine_temp: Option<f64>,
    /// Door state
    pub door_status: Option<DoorStatus>,
    /// Cabin temperature in °C
    pub cabin_temp: Option<f64>,
    /// Driver fatigue estimate
    pub driver_fatigue_level: Option<FatigueLevel>,
    /// Next stop name
    pub next_stop: Option<String>,
    /// Camera streams, any JSON shape
    pub cctv_urls: Option<Value>,
}

impl BusInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("route_number", self.route_number.as_ref());
        checker.text("plate_number", self.plate_number.as_ref());
        checker.text("driver_name", self.driver_name.as_ref());
        check_point(&mut checker, "location", self.location.as_ref());
        checker.required("bearing", self.bearing.as_ref());
        checker.float_range("bearing", self.bearing, 0.0, 360.0);
        for (field, value) in [("speed", self.speed), ("rpm", self.rpm)] {
            checker.required(field, value.as_ref());
            checker.float_range(field, value, 0.0, f64::MAX);
        }
        checker.required("passengers", self.passengers.as_ref());
        checker.int_range("passengers", self.passengers, 0, i32::MAX);
        checker.required("status", self.status.as_ref());
        checker.required("fuel_level", self.fuel_level.as_ref());
        checker.float_range("fuel_level", self.fuel_level, 0.0, 100.0);
        for (field, value) in [("engine_temp", self.engine_temp), ("cabin_temp", self.cabin_temp)] {
            checker.required(field, value.as_ref());
            checker.finite(field, value);
        }
        checker.required("door_status", self.door_status.as_ref());
        checker.required("driver_fatigue_level", self.driver_fatigue_level.as_ref());
        checker.text("next_stop", self.next_stop.as_ref());
        checker.finish()
    }
}

async fn find_bus<C: ConnectionTrait>(db: &C, scope: Scope, id: Uuid) -> Result<BusModel> {
    let bus = Bus::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Bus", id))?;
    scope.ensure(bus.organization_id)?;
    Ok(bus)
}

/// Bus resource
pub struct Buses;

impl Resource for Buses {
    const NAME: &'static str = "buses";
    type Input = BusInput;
    type View = Located<BusModel>;

    async fn list(db: &DatabaseConnection, scope: Scope) -> Result<Vec<Self::View>> {
        let buses = Bus::find()
            .filter(scope.condition(BusColumn::OrganizationId))
            .order_by_asc(BusColumn::RouteNumber)
            .order_by_asc(BusColumn::PlateNumber)
            .all(db)
            .await?;
        geo::attach_locations(db, buses, |b| b.location_id).await
    }

    async fn retrieve(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<Self::View> {
        let bus = find_bus(db, scope, id).await?;
        let location_id = bus.location_id;
        geo::attach_location(db, bus, location_id).await
    }

    async fn create(db: &DatabaseConnection, scope: Scope, input: BusInput) -> Result<Self::View> {
        input.validate(WriteMode::Create)?;
        let (
            Some(route_number),
            Some(plate_number),
            Some(driver_name),
            Some(location),
            Some(bearing),
            Some(speed),
            Some(rpm),
            Some(passengers),
            Some(status),
            Some(fuel_level),
            Some(engine_temp),
            Some(door_status),
            Some(cabin_temp),
            Some(driver_fatigue_level),
            Some(next_stop),
        ) = (
            input.route_number,
            input.plate_number,
            input.driver_name,
            input.location,
            input.bearing,
            input.speed,
            input.rpm,
            input.passengers,
            input.status,
            input.fuel_level,
            input.engine_temp,
            input.door_status,
            input.cabin_temp,
            input.driver_fatigue_level,
            input.next_stop,
        )
        else {
            return Err(Error::field("route_number", REQUIRED));
        };
        let txn = db.begin().await?;
        let owner = organization::owner_for_create(&txn, scope, input.organization).await?;
        let location = geo::insert_coordinate(&txn, location).await?;
        let bus = bus::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(owner),
            route_number: Set(route_number),
            plate_number: Set(plate_number),
            driver_name: Set(driver_name),
            location_id: Set(location.id),
            bearing: Set(bearing),
            speed: Set(speed),
            rpm: Set(rpm),
            passengers: Set(passengers),
            status: Set(status),
            fuel_level: Set(fuel_level),
            engine_temp: Set(engine_temp),
            door_status: Set(door_status),
            cabin_temp: Set(cabin_temp),
            driver_fatigue_level: Set(driver_fatigue_level),
            next_stop: Set(next_stop),
            cctv_urls: Set(input.cctv_urls.unwrap_or_else(|| Value::Array(Vec::new()))),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        info!(route = %bus.route_number, plate = %bus.plate_number, "Registered bus");
        Ok(Located {
            item: bus,
            location: Some(location),
        })
    }

    async fn update(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
        input: BusInput,
        mode: WriteMode,
    ) -> Result<Self::View> {
        input.validate(mode)?;
        let txn = db.begin().await?;
        let existing = find_bus(&txn, scope, id).await?;
        let owner =
            organization::owner_for_update(&txn, scope, existing.organization_id, input.organization).await?;
        if let Some(location) = input.location {
            geo::move_coordinate(&txn, existing.location_id, location).await?;
        }
        let location_id = existing.location_id;
        let mut active: bus::ActiveModel = existing.into();
        active.organization_id = Set(owner);
        assign(&mut active.route_number, input.route_number);
        assign(&mut active.plate_number, input.plate_number);
        assign(&mut active.driver_name, input.driver_name);
        assign(&mut active.bearing, input.bearing);
        assign(&mut active.speed, input.speed);
        assign(&mut active.rpm, input.rpm);
        assign(&mut active.passengers, input.passengers);
        assign(&mut active.status, input.status);
        assign(&mut active.fuel_level, input.fuel_level);
        assign(&mut active.engine_temp, input.engine_temp);
        assign(&mut active.door_status, input.door_status);
        assign(&mut active.cabin_temp, input.cabin_temp);
        assign(&mut active.driver_fatigue_level, input.driver_fatigue_level);
        assign(&mut active.next_stop, input.next_stop);
        assign(&mut active.cctv_urls, input.cctv_urls);
        let bus = active.update(&txn).await?;
        let view = geo::attach_location(&txn, bus, location_id).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn delete(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<()> {
        let txn = db.begin().await?;
        let bus = find_bus(&txn, scope, id).await?;
        Bus::delete_by_id(id).exec(&txn).await?;
        geo::delete_coordinates(&txn, [bus.location_id]).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// Buses in one status.
pub async fn buses_by_status(
    db: &DatabaseConnection,
    scope: Scope,
    status: BusStatus,
) -> Result<Vec<Located<BusModel>>> {
    let buses = Bus::find()
        .filter(scope.condition(BusColumn::OrganizationId))
        .filter(BusColumn::Status.eq(status))
        .order_by_asc(BusColumn::RouteNumber)
        .all(db)
        .await?;
    geo::attach_locations(db, buses, |b| b.location_id).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use serde_json::json;

    fn bus_input(route: &str, status: BusStatus) -> BusInput {
        BusInput {
            route_number: Some(route.into()),
            plate_number: Some("40 A 123 BC".into()),
            driver_name: Some("Jasur Karimov".into()),
            location: Some(Point::new(40.386, 71.786)),
            bearing: Some(90.0),
            speed: Some(32.5),
            rpm: Some(1800.0),
            passengers: Some(24),
            status: Some(status),
            fuel_level: Some(64.0),
            engine_temp: Some(88.0),
            door_status: Some(DoorStatus::Closed),
            cabin_temp: Some(22.0),
            driver_fatigue_level: Some(FatigueLevel::Low),
            next_stop: Some("Dehqon bozori".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_bus_defaults_cctv_to_empty_list() -> Result<()> {
        let db = setup_test_db().await?;
        let bus = Buses::create(&db, Scope::All, bus_input("12", BusStatus::OnTime)).await?;
        assert_eq!(bus.item.cctv_urls, json!([]));

        let json = serde_json::to_value(&bus).unwrap();
        assert_eq!(json["status"], "ON_TIME");
        assert_eq!(json["door_status"], "CLOSED");
        assert_eq!(json["driver_fatigue_level"], "LOW");
        assert!(json["location"].is_object());
        Ok(())
    }

    #[tokio::test]
    async fn test_bearing_out_of_range() -> Result<()> {
        let db = setup_test_db().await?;
        let mut input = bus_input("12", BusStatus::OnTime);
        input.bearing = Some(400.0);
        input.passengers = Some(-1);
        let result = Buses::create(&db, Scope::All, input).await;
        let Err(Error::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.contains("bearing"));
        assert!(errors.contains("passengers"));
        Ok(())
    }

    #[tokio::test]
    async fn test_patch_moves_bus() -> Result<()> {
        let db = setup_test_db().await?;
        let bus = Buses::create(&db, Scope::All, bus_input("12", BusStatus::OnTime)).await?;
        let patch = BusInput {
            location: Some(Point::new(40.4, 71.8)),
            status: Some(BusStatus::Sos),
            ..Default::default()
        };
        let moved = Buses::update(&db, Scope::All, bus.item.id, patch, WriteMode::Patch).await?;
        let location = moved.location.unwrap();
        assert!((location.lat - 40.4).abs() < 1e-9);
        assert_eq!(moved.item.status, BusStatus::Sos);
        assert_eq!(moved.item.passengers, 24);
        Ok(())
    }

    #[tokio::test]
    async fn test_buses_by_status() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "tashkent_admin").await?;
        Buses::create(&db, Scope::Organization(org.item.id), bus_input("7", BusStatus::Delayed)).await?;
        Buses::create(&db, Scope::All, bus_input("12", BusStatus::Delayed)).await?;
        Buses::create(&db, Scope::All, bus_input("3", BusStatus::OnTime)).await?;

        let delayed = buses_by_status(&db, Scope::All, BusStatus::Delayed).await?;
        let routes: Vec<_> = delayed.iter().map(|b| b.item.route_number.as_str()).collect();
        assert_eq!(routes, ["12", "7"]);
        let mine = buses_by_status(&db, Scope::Organization(org.item.id), BusStatus::Delayed).await?;
        assert_eq!(mine.len(), 1);
        Ok(())
    }
}

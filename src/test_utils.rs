//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults. Entities are created
//! through the same resource operations the API uses, so validation and owned
//! rows behave exactly as in production.

use crate::{
    core::{
        climate::{BoilerInput, BoilerView, Boilers, RoomInput, Rooms},
        device_health::DeviceHealthInput,
        geo::{self, Centered, DistrictInput, Districts, Located, Point, RegionInput, Regions},
        iot::{IotDeviceInput, IotDevices},
        organization::{OrganizationInput, OrganizationView, Organizations},
        resource::Resource,
        tenant::Scope,
        waste::{TruckInput, Trucks, WasteBinInput, WasteBins},
    },
    entities::{
        DistrictModel, IotDeviceModel, RegionModel, RoomModel, TruckModel, WasteBinModel,
        organization::OrganizationType, types::SensorStatus,
    },
    errors::Result,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

/// Password given to every organization and truck created here
pub const TEST_PASSWORD: &str = "test-password";

/// Region the default organization hierarchy lives in
const TEST_REGION: &str = "Farg'ona Viloyati";
/// District the default organization hierarchy lives in
const TEST_DISTRICT: &str = "Farg'ona Shahri";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Installs a test-writer tracing subscriber, once per process.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Creates a region centered on Farg'ona.
pub async fn create_test_region(db: &DatabaseConnection, name: &str) -> Result<Centered<RegionModel>> {
    Regions::create(
        db,
        Scope::All,
        RegionInput {
            name: Some(name.to_string()),
            center: Some(Point::new(40.3864, 71.7864)),
        },
    )
    .await
}

/// Creates a district inside `region_id`.
pub async fn create_test_district(
    db: &DatabaseConnection,
    region_id: Uuid,
    name: &str,
) -> Result<Centered<DistrictModel>> {
    Districts::create(
        db,
        Scope::All,
        DistrictInput {
            name: Some(name.to_string()),
            region: Some(region_id),
            center: Some(Point::new(40.3734, 71.7978)),
        },
    )
    .await
}

/// Builds a complete organization payload for `login`.
///
/// The default region and district are created on first use and referenced
/// by name.
///
/// # Defaults
/// * `name`: the login with `" org"` appended
/// * `type`: `HOKIMIYAT`
/// * `password`: [`TEST_PASSWORD`]
/// * `enabled_modules`: none
pub async fn test_organization_input(db: &DatabaseConnection, login: &str) -> Result<OrganizationInput> {
    let region = match geo::resolve_region(db, TEST_REGION).await? {
        Some(region) => region,
        None => create_test_region(db, TEST_REGION).await?.item,
    };
    if geo::resolve_district(db, TEST_DISTRICT).await?.is_none() {
        create_test_district(db, region.id, TEST_DISTRICT).await?;
    }
    Ok(OrganizationInput {
        name: Some(format!("{login} org")),
        kind: Some(OrganizationType::Hokimiyat),
        login: Some(login.to_string()),
        password: Some(TEST_PASSWORD.to_string()),
        region: Some(TEST_REGION.to_string()),
        district: Some(TEST_DISTRICT.to_string()),
        center: Some(Point::new(40.3864, 71.7864)),
        enabled_modules: None,
    })
}

/// Creates an organization with [`test_organization_input`] defaults.
pub async fn create_test_organization(db: &DatabaseConnection, login: &str) -> Result<OrganizationView> {
    let input = test_organization_input(db, login).await?;
    Organizations::create(db, Scope::All, input).await
}

/// Creates a truck owned by `organization_id` that can log in as `login`.
pub async fn create_test_truck(
    db: &DatabaseConnection,
    organization_id: Uuid,
    login: &str,
) -> Result<Located<TruckModel>> {
    Trucks::create(
        db,
        Scope::All,
        TruckInput {
            organization: Some(organization_id),
            driver_name: Some(format!("Driver {login}")),
            plate_number: Some("40 T 001 AA".to_string()),
            phone: Some("+998901112233".to_string()),
            toza_hudud: None,
            location: Some(Point::new(40.39, 71.78)),
            status: None,
            fuel_level: None,
            login: Some(login.to_string()),
            password: Some(TEST_PASSWORD.to_string()),
        },
    )
    .await
}

/// Creates an empty waste bin at `address`.
pub async fn create_test_waste_bin(
    db: &DatabaseConnection,
    organization_id: Uuid,
    address: &str,
) -> Result<Located<WasteBinModel>> {
    WasteBins::create(
        db,
        Scope::All,
        WasteBinInput {
            organization: Some(organization_id),
            address: Some(address.to_string()),
            location: Some(Point::new(40.3842, 71.7843)),
            camera_url: Some("rtsp://cam/bin".to_string()),
            google_maps_url: Some("https://maps.google.com/?q=40.3842,71.7843".to_string()),
            ..Default::default()
        },
    )
    .await
}

/// Creates a room at target humidity.
pub async fn create_test_room(db: &DatabaseConnection, name: &str) -> Result<RoomModel> {
    Rooms::create(
        db,
        Scope::All,
        RoomInput {
            name: Some(name.to_string()),
            target_humidity: Some(50.0),
            humidity: Some(50.0),
            temperature: Some(21.0),
            status: Some(SensorStatus::Optimal),
            trend: None,
            last_updated: None,
        },
    )
    .await
}

/// Creates a boiler heating `rooms`, with a healthy device.
pub async fn create_test_boiler(db: &DatabaseConnection, name: &str, rooms: Vec<Uuid>) -> Result<BoilerView> {
    Boilers::create(
        db,
        Scope::All,
        BoilerInput {
            name: Some(name.to_string()),
            target_humidity: Some(60.0),
            humidity: Some(60.0),
            temperature: Some(25.0),
            status: Some(SensorStatus::Optimal),
            trend: None,
            last_updated: None,
            device_health: Some(DeviceHealthInput {
                battery_level: Some(100.0),
                signal_strength: Some(90.0),
                last_ping: Some(Utc::now()),
                firmware_version: Some("v1.0".to_string()),
                is_online: Some(true),
            }),
            connected_rooms: Some(rooms),
        },
    )
    .await
}

/// Registers an IoT device, optionally linked to a room or a boiler.
pub async fn create_test_iot_device(
    db: &DatabaseConnection,
    device_id: &str,
    room: Option<Uuid>,
    boiler: Option<Uuid>,
) -> Result<Located<IotDeviceModel>> {
    IotDevices::create(
        db,
        Scope::All,
        IotDeviceInput {
            device_id: Some(device_id.to_string()),
            room,
            boiler,
            ..Default::default()
        },
    )
    .await
}

//! Seeding reference data.
//!
//! [`seed_from_config`] upserts the regions, districts and organizations
//! listed in config.toml. [`seed_demo`] adds a small Farg'ona dataset (bins,
//! trucks, facilities with boilers and rooms) for trying the service out.
//! Both skip rows that already exist, so running them twice is harmless.

use super::app::{AppConfig, OrganizationSeed};
use crate::core::climate::{BoilerInput, Boilers, FacilityInput, Facilities, RoomInput, Rooms};
use crate::core::device_health::DeviceHealthInput;
use crate::core::geo::{self, DistrictInput, Districts, Point, RegionInput, Regions};
use crate::core::organization::{self, OrganizationInput, Organizations};
use crate::core::resource::Resource;
use crate::core::tenant::Scope;
use crate::core::waste::{TruckInput, Trucks, WasteBinInput, WasteBins};
use crate::entities::facility::FacilityType;
use crate::entities::organization::OrganizationType;
use crate::entities::truck::TruckStatus;
use crate::entities::types::{Module, SensorStatus};
use crate::entities::{
    District, DistrictColumn, DistrictModel, Facility, FacilityColumn, RegionModel, Truck,
    TruckColumn, WasteBin, WasteBinColumn,
};
use crate::errors::Result;
use chrono::Utc;
use sea_orm::{DatabaseConnection, prelude::*};
use serde_json::json;
use tracing::{debug, info};

/// Rows created by a seeding run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Regions created
    pub regions: usize,
    /// Districts created
    pub districts: usize,
    /// Organizations created
    pub organizations: usize,
    /// Waste bins created
    pub waste_bins: usize,
    /// Trucks created
    pub trucks: usize,
    /// Facilities created
    pub facilities: usize,
}

async fn ensure_region(
    db: &DatabaseConnection,
    name: &str,
    center: Point,
    report: &mut SeedReport,
) -> Result<RegionModel> {
    if let Some(existing) = geo::resolve_region(db, name).await? {
        debug!(region = %name, "Region already exists");
        return Ok(existing);
    }
    let input = RegionInput {
        name: Some(name.to_string()),
        center: Some(center),
    };
    let created = Regions::create(db, Scope::All, input).await?;
    info!(region = %name, "Created region");
    report.regions += 1;
    Ok(created.item)
}

async fn ensure_district(
    db: &DatabaseConnection,
    region: &RegionModel,
    name: &str,
    center: Point,
    report: &mut SeedReport,
) -> Result<DistrictModel> {
    if let Some(existing) = District::find()
        .filter(DistrictColumn::RegionId.eq(region.id))
        .filter(DistrictColumn::Name.eq(name))
        .one(db)
        .await?
    {
        debug!(district = %name, "District already exists");
        return Ok(existing);
    }
    let input = DistrictInput {
        name: Some(name.to_string()),
        region: Some(region.id),
        center: Some(center),
    };
    let created = Districts::create(db, Scope::All, input).await?;
    info!(district = %name, region = %region.name, "Created district");
    report.districts += 1;
    Ok(created.item)
}

async fn ensure_organization(
    db: &DatabaseConnection,
    seed: &OrganizationSeed,
    report: &mut SeedReport,
) -> Result<Uuid> {
    if let Some(existing) = organization::find_by_key(db, &seed.login).await? {
        debug!(login = %seed.login, "Organization already exists");
        return Ok(existing.id);
    }
    let input = OrganizationInput {
        name: Some(seed.name.clone()),
        kind: Some(seed.kind),
        login: Some(seed.login.clone()),
        password: Some(seed.password.clone()),
        region: Some(seed.region.clone()),
        district: Some(seed.district.clone()),
        center: Some(Point::new(seed.lat, seed.lng)),
        enabled_modules: Some(seed.enabled_modules.clone()),
    };
    let created = Organizations::create(db, Scope::All, input).await?;
    report.organizations += 1;
    Ok(created.item.id)
}

/// Creates the configured regions, districts and organizations that do not
/// exist yet.
pub async fn seed_from_config(db: &DatabaseConnection, config: &AppConfig) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for region_seed in &config.regions {
        let center = Point::new(region_seed.lat, region_seed.lng);
        let region = ensure_region(db, &region_seed.name, center, &mut report).await?;
        for district in &region_seed.districts {
            let center = Point::new(district.lat, district.lng);
            ensure_district(db, &region, &district.name, center, &mut report).await?;
        }
    }

    for org in &config.organizations {
        ensure_organization(db, org, &mut report).await?;
    }

    info!(?report, "Seeding from configuration finished");
    Ok(report)
}

const DEMO_REGION: &str = "Farg'ona";
const DEMO_PASSWORD: &str = "123";

/// Districts of the demo region: name, lat, lng
const DEMO_DISTRICTS: [(&str, f64, f64); 4] = [
    ("Farg'ona Shahri", 40.3775, 71.7861),
    ("Qo'shtepa", 40.5123, 71.4567),
    ("Buvayda", 40.2345, 71.9876),
    ("Yozyovon", 40.1234, 71.6543),
];

/// Demo bins: address, lat, lng, cleaning zone
const DEMO_BINS: [(&str, f64, f64, &str); 5] = [
    ("Farg'ona shahar, Mustaqillik ko'chasi 15-uy", 40.3770, 71.7850, "1-sonli Toza Hudud"),
    ("Farg'ona shahar, Beruniy ko'chasi 8-uy", 40.3780, 71.7860, "1-sonli Toza Hudud"),
    ("Farg'ona shahar, Navoiy ko'chasi 22-uy", 40.3790, 71.7870, "2-sonli Toza Hudud"),
    ("Qo'shtepa tumani, Markaziy maydon", 40.5100, 71.4500, "3-sonli Toza Hudud"),
    ("Buvayda tumani, Boshkvartir", 40.2300, 71.9800, "4-sonli Toza Hudud"),
];

/// Demo trucks: driver, plate, phone, cleaning zone
const DEMO_TRUCKS: [(&str, &str, &str, &str); 3] = [
    ("Rahimov Akmal", "FA 777 AA", "+998901234567", "1-sonli Toza Hudud"),
    ("Karimov Jonibek", "FA 778 AA", "+998901234568", "2-sonli Toza Hudud"),
    ("Habibov Oybek", "FA 779 AA", "+998901234569", "3-sonli Toza Hudud"),
];

/// Demo facilities: name, type, neighbourhood, manager
const DEMO_FACILITIES: [(&str, FacilityType, &str, &str); 6] = [
    ("Farg'ona 1-maktab", FacilityType::School, "Farg'ona Shahri", "Karimova Gulnora"),
    ("Farg'ona 5-maktab", FacilityType::School, "Farg'ona Shahri", "Rahimov Asliddin"),
    ("Farg'ona 1-bog'cha", FacilityType::Kindergarten, "Farg'ona Shahri", "Hakimova Malika"),
    ("Farg'ona 3-bog'cha", FacilityType::Kindergarten, "Qo'shtepa", "Muminova Dildora"),
    ("Farg'ona Shahar Bosh Shifoxonasi", FacilityType::Hospital, "Farg'ona Shahri", "Tursunov Davron"),
    ("Qo'shtepa Tuman Bemorxonas", FacilityType::Hospital, "Qo'shtepa", "Rashidov Javlon"),
];

const DEMO_TREND: [f64; 10] = [45.0, 46.0, 47.0, 48.0, 49.0, 50.0, 51.0, 50.0, 49.0, 48.0];
const DEMO_HISTORY: [f64; 10] = [75.0, 76.0, 74.0, 78.0, 77.0, 80.0, 79.0, 76.0, 75.0, 77.0];

/// Login of a demo driver, e.g. `driver_fa_777_aa`.
fn driver_login(plate: &str) -> String {
    format!("driver_{}", plate.replace(' ', "_").to_lowercase())
}

/// Adds the Farg'ona demo dataset.
///
/// Boilers and rooms are only created together with a new facility.
pub async fn seed_demo(db: &DatabaseConnection) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    let region = ensure_region(db, DEMO_REGION, Point::new(40.3775, 71.7861), &mut report).await?;
    let mut city = None;
    for (name, lat, lng) in DEMO_DISTRICTS {
        let district = ensure_district(db, &region, name, Point::new(lat, lng), &mut report).await?;
        city.get_or_insert(district);
    }
    let city = city.map_or_else(String::new, |d| d.id.to_string());

    let waste_org = OrganizationSeed {
        name: "Farg'ona Tozalik Agenligi".to_string(),
        kind: OrganizationType::Agency,
        login: "fargona_tozalik".to_string(),
        password: DEMO_PASSWORD.to_string(),
        region: region.id.to_string(),
        district: city.clone(),
        lat: 40.3780,
        lng: 71.7870,
        enabled_modules: vec![Module::Waste, Module::Climate],
    };
    let climate_org = OrganizationSeed {
        name: "Farg'ona Ta'lim Aholi Yashash Shartlari Boshqarmasi".to_string(),
        kind: OrganizationType::Hokimiyat,
        login: "fargona_climate".to_string(),
        lat: 40.3785,
        lng: 71.7875,
        enabled_modules: vec![Module::Climate, Module::Waste],
        ..waste_org.clone()
    };
    let waste_org_id = ensure_organization(db, &waste_org, &mut report).await?;
    ensure_organization(db, &climate_org, &mut report).await?;

    for (address, lat, lng, hudud) in DEMO_BINS {
        let exists = WasteBin::find()
            .filter(WasteBinColumn::OrganizationId.eq(waste_org_id))
            .filter(WasteBinColumn::Address.eq(address))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }
        let input = WasteBinInput {
            organization: Some(waste_org_id),
            address: Some(address.to_string()),
            location: Some(Point::new(lat, lng)),
            toza_hudud: Some(hudud.to_string()),
            fill_level: Some(45),
            is_full: Some(false),
            device_health: Some(json!({
                "battery_level": 95,
                "signal_strength": 85,
                "last_ping": Utc::now().to_rfc3339(),
                "firmware_version": "v1.0",
                "is_online": true,
            })),
            ..Default::default()
        };
        WasteBins::create(db, Scope::All, input).await?;
        info!(%address, "Created waste bin");
        report.waste_bins += 1;
    }

    for (driver, plate, phone, hudud) in DEMO_TRUCKS {
        let exists = Truck::find()
            .filter(TruckColumn::PlateNumber.eq(plate))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }
        let input = TruckInput {
            organization: Some(waste_org_id),
            driver_name: Some(driver.to_string()),
            plate_number: Some(plate.to_string()),
            phone: Some(phone.to_string()),
            toza_hudud: Some(hudud.to_string()),
            location: Some(Point::new(40.3775, 71.7861)),
            status: Some(TruckStatus::Idle),
            fuel_level: Some(85),
            login: Some(driver_login(plate)),
            password: Some(DEMO_PASSWORD.to_string()),
        };
        Trucks::create(db, Scope::All, input).await?;
        info!(%plate, "Created truck");
        report.trucks += 1;
    }

    for (name, kind, mfy, manager) in DEMO_FACILITIES {
        let exists = Facility::find()
            .filter(FacilityColumn::Name.eq(name))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }
        seed_facility(db, name, kind, mfy, manager).await?;
        info!(facility = %name, "Created facility with boiler and rooms");
        report.facilities += 1;
    }

    info!(?report, "Demo data seeded");
    Ok(report)
}

async fn seed_facility(
    db: &DatabaseConnection,
    name: &str,
    kind: FacilityType,
    mfy: &str,
    manager: &str,
) -> Result<()> {
    let mut rooms = Vec::with_capacity(3);
    for (number, humidity) in [(101, 47.0), (102, 48.0), (103, 49.0)] {
        let room = Rooms::create(
            db,
            Scope::All,
            RoomInput {
                name: Some(format!("{name} Xona {number}")),
                target_humidity: Some(50.0),
                humidity: Some(humidity),
                temperature: None,
                status: Some(SensorStatus::Optimal),
                trend: Some(DEMO_TREND.to_vec()),
                last_updated: None,
            },
        )
        .await?;
        rooms.push(room.id);
    }

    let boiler = Boilers::create(
        db,
        Scope::All,
        BoilerInput {
            name: Some(format!("{name} Qozonxonasi")),
            target_humidity: Some(50.0),
            humidity: Some(48.0),
            temperature: None,
            status: Some(SensorStatus::Optimal),
            trend: Some(DEMO_TREND.to_vec()),
            last_updated: None,
            device_health: Some(DeviceHealthInput {
                battery_level: Some(90.0),
                signal_strength: Some(95.0),
                last_ping: Some(Utc::now()),
                firmware_version: Some("v1.0".to_string()),
                is_online: Some(true),
            }),
            connected_rooms: Some(rooms),
        },
    )
    .await?;

    Facilities::create(
        db,
        Scope::All,
        FacilityInput {
            name: Some(name.to_string()),
            kind: Some(kind),
            mfy: Some(mfy.to_string()),
            overall_status: Some(SensorStatus::Optimal),
            energy_usage: Some(75.0),
            efficiency_score: Some(85.0),
            manager_name: Some(manager.to_string()),
            last_maintenance: Some(Utc::now()),
            history: Some(DEMO_HISTORY.to_vec()),
            boilers: Some(vec![boiler.item.id]),
        },
    )
    .await?;
    Ok(())
}

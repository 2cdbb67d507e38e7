//! Simulated temperature/humidity readings for active IoT devices.
//!
//! Readings go through [`iot::ingest_reading`], the same path as
//! `POST /iot/update/`, so the device and its room or boiler are updated
//! exactly as if the hardware had reported.

use crate::core::iot::{self, SensorReading};
use crate::entities::{IotDevice, IotDeviceColumn, IotDeviceModel};
use crate::errors::Result;
use chrono::Utc;
use rand::{Rng, SeedableRng, rngs::StdRng};
use sea_orm::{DatabaseConnection, QueryOrder, prelude::*};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Sleep interval simulated devices announce
const SLEEP_SECONDS: i32 = 2000;

/// Base temperature (°C) and humidity (%) around which readings vary.
#[must_use]
pub const fn baseline(device: &IotDeviceModel) -> (f64, f64) {
    if device.room_id.is_some() {
        (21.0, 50.0)
    } else if device.boiler_id.is_some() {
        (25.0, 60.0)
    } else {
        (20.0, 45.0)
    }
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One simulated reading around `base`.
///
/// Temperature varies by ±5 °C and humidity by ±20 %, both rounded to one
/// decimal. Warm readings (above 25 °C) come out 5 % more humid, cold ones
/// (below 15 °C) 5 % drier. Humidity always stays within 0..=100.
pub fn simulate_reading<R: Rng + ?Sized>(rng: &mut R, (base_temperature, base_humidity): (f64, f64)) -> (f64, f64) {
    let temperature = one_decimal(base_temperature + rng.random_range(-5.0..=5.0));
    let mut humidity = one_decimal((base_humidity + rng.random_range(-20.0..=20.0)).clamp(0.0, 100.0));
    if temperature > 25.0 {
        humidity = (humidity + 5.0).min(100.0);
    } else if temperature < 15.0 {
        humidity = (humidity - 5.0).max(0.0);
    }
    (temperature, humidity)
}

/// Outcome of one sensor round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SensorReport {
    /// Devices that stored a reading
    pub updated: usize,
    /// Devices whose reading could not be stored
    pub failed: usize,
}

/// Takes one round of readings with a freshly seeded generator.
pub async fn simulate_sensors(db: &DatabaseConnection) -> Result<SensorReport> {
    let mut rng = StdRng::from_os_rng();
    simulate_sensors_with(db, &mut rng).await
}

/// Takes one round of readings from every active device, drawing from `rng`.
///
/// A device that fails is logged and skipped; only failing to load the
/// devices fails the round.
#[instrument(skip_all)]
pub async fn simulate_sensors_with<R: Rng + Send>(db: &DatabaseConnection, rng: &mut R) -> Result<SensorReport> {
    let devices = IotDevice::find()
        .filter(IotDeviceColumn::IsActive.eq(true))
        .order_by_asc(IotDeviceColumn::DeviceId)
        .all(db)
        .await?;
    let mut report = SensorReport::default();

    for device in devices {
        let (temperature, humidity) = simulate_reading(rng, baseline(&device));
        let reading = SensorReading {
            device_id: device.device_id.clone(),
            temperature,
            humidity,
            sleep_seconds: Some(SLEEP_SECONDS),
            reported_at: Some(Utc::now()),
        };
        match iot::ingest_reading(db, reading).await {
            Ok(_) => {
                report.updated += 1;
                debug!(device_id = %device.device_id, temperature, humidity, "Device updated");
            }
            Err(e) => {
                report.failed += 1;
                warn!(device_id = %device.device_id, error = %e, "Failed to store simulated reading");
            }
        }
    }

    info!(updated = report.updated, failed = report.failed, "IoT sensor round completed");
    Ok(report)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::resource::Resource;
    use crate::core::tenant::Scope;
    use crate::core::validation::WriteMode;
    use crate::core::iot::{IotDeviceInput, IotDevices};
    use crate::entities::{Boiler, Room};
    use crate::test_utils::*;

    #[test]
    fn test_readings_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(9);
        for base in [(21.0, 50.0), (25.0, 60.0), (20.0, 45.0), (20.0, 95.0), (20.0, 2.0)] {
            for _ in 0..500 {
                let (temperature, humidity) = simulate_reading(&mut rng, base);
                assert!((base.0 - 5.0..=base.0 + 5.0).contains(&temperature));
                assert!((0.0..=100.0).contains(&humidity), "humidity {humidity}");
                assert_eq!(one_decimal(temperature), temperature);
            }
        }
    }

    #[test]
    fn test_one_decimal() {
        assert_eq!(one_decimal(21.04), 21.0);
        assert_eq!(one_decimal(21.06), 21.1);
        assert_eq!(one_decimal(-3.25), -3.3);
    }

    #[tokio::test]
    async fn test_round_updates_linked_rows_and_skips_inactive() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;
        let room = create_test_room(&db, "Xona 101").await?;
        let boiler = create_test_boiler(&db, "Qozonxona", vec![]).await?;
        create_test_iot_device(&db, "ESP-0000AAAA", Some(room.id), None).await?;
        create_test_iot_device(&db, "ESP-0000BBBB", None, Some(boiler.item.id)).await?;
        let idle = create_test_iot_device(&db, "ESP-0000CCCC", None, None).await?;
        let patch = IotDeviceInput {
            is_active: Some(false),
            ..Default::default()
        };
        IotDevices::update(&db, Scope::All, idle.item.id, patch, WriteMode::Patch).await?;

        let mut rng = StdRng::seed_from_u64(2);
        let report = simulate_sensors_with(&db, &mut rng).await?;
        assert_eq!(report, SensorReport { updated: 2, failed: 0 });

        let room = Room::find_by_id(room.id).one(&db).await?.unwrap();
        let temperature = room.temperature.unwrap();
        assert!((16.0..=26.0).contains(&temperature));
        assert!((0.0..=100.0).contains(&room.humidity));
        assert!(room.last_updated.is_some());

        let boiler = Boiler::find_by_id(boiler.item.id).one(&db).await?.unwrap();
        assert!((20.0..=30.0).contains(&boiler.temperature.unwrap()));

        let idle = IotDevice::find_by_id(idle.item.id).one(&db).await?.unwrap();
        assert_eq!(idle.last_seen, None);
        Ok(())
    }
}

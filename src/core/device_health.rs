//! Device health rows owned by boilers and SOS columns.

use super::validation::{Checker, WriteMode, assign};
use crate::entities::{DeviceHealth, DeviceHealthModel, device_health};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, Set, prelude::*};
use serde::Deserialize;
use std::collections::HashMap;

/// Nested `device_health` payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeviceHealthInput {
    /// Battery charge in percent
    pub battery_level: Option<f64>,
    /// Signal strength in percent
    pub signal_strength: Option<f64>,
    /// Last time the device answered
    pub last_ping: Option<DateTime<Utc>>,
    /// Firmware version
    pub firmware_version: Option<String>,
    /// Reachability, defaults to online
    pub is_online: Option<bool>,
}

/// Validates a nested health object under `field`.
///
/// Nested messages are reported as `field.inner`.
pub fn check(checker: &mut Checker, field: &str, input: Option<&DeviceHealthInput>) {
    checker.required(field, input);
    let Some(input) = input else {
        return;
    };
    // A nested object being replaced must be complete, even under PATCH of the parent
    let mut nested = Checker::new(match checker.mode() {
        WriteMode::Patch => WriteMode::Patch,
        _ => WriteMode::Create,
    });
    nested.float_range("battery_level", input.battery_level, 0.0, 100.0);
    nested.float_range("signal_strength", input.signal_strength, 0.0, 100.0);
    nested.required("battery_level", input.battery_level.as_ref());
    nested.required("signal_strength", input.signal_strength.as_ref());
    nested.required("last_ping", input.last_ping.as_ref());
    nested.text("firmware_version", input.firmware_version.as_ref());
    if let Err(Error::Validation(errors)) = nested.finish() {
        checker.add(field, errors.to_string());
    }
}

/// Inserts an owned health row.
pub async fn insert<C: ConnectionTrait>(db: &C, input: DeviceHealthInput) -> Result<DeviceHealthModel> {
    device_health::ActiveModel {
        id: Set(Uuid::new_v4()),
        battery_level: Set(input.battery_level.unwrap_or(100.0)),
        signal_strength: Set(input.signal_strength.unwrap_or(100.0)),
        last_ping: Set(input.last_ping.unwrap_or_else(Utc::now)),
        firmware_version: Set(input.firmware_version.unwrap_or_else(|| "v1.0".to_string())),
        is_online: Set(input.is_online.unwrap_or(true)),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Applies the present fields to an existing health row.
pub async fn update<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    input: DeviceHealthInput,
) -> Result<DeviceHealthModel> {
    let existing = DeviceHealth::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("DeviceHealth", id))?;
    let mut active: device_health::ActiveModel = existing.into();
    assign(&mut active.battery_level, input.battery_level);
    assign(&mut active.signal_strength, input.signal_strength);
    assign(&mut active.last_ping, input.last_ping);
    assign(&mut active.firmware_version, input.firmware_version);
    assign(&mut active.is_online, input.is_online);
    active.update(db).await.map_err(Into::into)
}

/// Deletes owned health rows.
pub async fn delete<C, I>(db: &C, ids: I) -> Result<()>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = Uuid>,
{
    let ids: Vec<Uuid> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(());
    }
    DeviceHealth::delete_many()
        .filter(device_health::Column::Id.is_in(ids))
        .exec(db)
        .await?;
    Ok(())
}

/// Loads health rows keyed by id.
pub async fn load_map<C, I>(db: &C, ids: I) -> Result<HashMap<Uuid, DeviceHealthModel>>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = Uuid>,
{
    let ids: Vec<Uuid> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(DeviceHealth::find()
        .filter(device_health::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|h| (h.id, h))
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::setup_test_db;

    #[test]
    fn test_nested_errors_are_reported_under_parent_field() {
        let mut checker = Checker::new(WriteMode::Create);
        check(
            &mut checker,
            "device_health",
            Some(&DeviceHealthInput {
                battery_level: Some(120.0),
                ..Default::default()
            }),
        );
        assert!(checker.has_error("device_health"));
    }

    #[tokio::test]
    async fn test_insert_and_partial_update() -> Result<()> {
        let db = setup_test_db().await?;
        let health = insert(
            &db,
            DeviceHealthInput {
                battery_level: Some(90.0),
                signal_strength: Some(95.0),
                firmware_version: Some("v1.0".into()),
                ..Default::default()
            },
        )
        .await?;
        assert!(health.is_online);

        let updated = update(
            &db,
            health.id,
            DeviceHealthInput {
                is_online: Some(false),
                ..Default::default()
            },
        )
        .await?;
        assert!(!updated.is_online);
        assert_eq!(updated.battery_level, 90.0);

        delete(&db, [health.id]).await?;
        assert!(load_map(&db, [health.id]).await?.is_empty());
        Ok(())
    }
}

//! Value types shared by several entities: the sensor status scale, the
//! module flags an organization can enable, and JSON-backed list columns.

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Three-level health scale used by moisture sensors, rooms, boilers,
/// facilities, air sensors and report entries
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorStatus {
    /// Within target range
    #[sea_orm(string_value = "OPTIMAL")]
    Optimal,
    /// Drifting from target
    #[sea_orm(string_value = "WARNING")]
    Warning,
    /// Needs intervention
    #[sea_orm(string_value = "CRITICAL")]
    Critical,
}

/// Feature module that can be enabled for an organization
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Module {
    /// Overview dashboard
    Dashboard,
    /// Waste collection
    Waste,
    /// Room and boiler climate
    Climate,
    /// Soil moisture
    Moisture,
    /// SOS columns
    Security,
    /// Eco violations
    EcoControl,
    /// Construction sites
    Construction,
    /// Street lighting
    LightInspector,
    /// Air quality
    Air,
    /// Public transport
    Transport,
    /// Citizen call center
    CallCenter,
    /// Reports
    Analytics,
}

impl Module {
    /// Every module, in menu order.
    #[must_use]
    pub fn all() -> Vec<Self> {
        <Self as sea_orm::Iterable>::iter().collect()
    }
}

/// Ordered list of enabled modules, stored as a JSON array
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ModuleList(pub Vec<Module>);

/// Numeric series (humidity trend, energy history), stored as a JSON array
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Series(pub Vec<f64>);

/// List of free-text labels (keywords, detected objects), stored as a JSON array
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Labels(pub Vec<String>);

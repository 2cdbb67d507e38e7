//! Application configuration loading from config.toml
//!
//! Every section is optional; a missing file or section falls back to the
//! defaults below. The `[[regions]]` and `[[organizations]]` tables seed the
//! administrative hierarchy and tenant logins (see [`super::seed`]).

use crate::entities::organization::OrganizationType;
use crate::entities::types::Module;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Session and login settings
    pub auth: AuthConfig,
    /// Periodic simulation jobs
    pub simulation: SimulationConfig,
    /// Regions (with their districts) to seed
    pub regions: Vec<RegionSeed>,
    /// Organizations to seed
    pub organizations: Vec<OrganizationSeed>,
}

/// `[server]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

/// `[auth]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Tokens older than this are rejected and deleted
    pub token_ttl_hours: u32,
    /// Emergency superadmin login accepted without a user row
    pub superadmin_login: Option<String>,
    /// Password for `superadmin_login`
    pub superadmin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: 24 * 14,
            superadmin_login: None,
            superadmin_password: None,
        }
    }
}

impl AuthConfig {
    /// Token lifetime.
    #[must_use]
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.token_ttl_hours))
    }

    /// The bypass credentials, when both halves are configured.
    #[must_use]
    pub fn superadmin(&self) -> Option<(&str, &str)> {
        match (&self.superadmin_login, &self.superadmin_password) {
            (Some(login), Some(password)) => Some((login, password)),
            _ => None,
        }
    }
}

/// `[simulation]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Spawn the jobs alongside `serve`
    pub enabled: bool,
    /// Waste-bin fill analysis period
    pub waste_bin_interval_secs: u64,
    /// Camera screenshot period
    pub camera_interval_secs: u64,
    /// IoT sensor reading period
    pub iot_interval_secs: u64,
    /// Wait after a failed batch before trying again
    pub retry_after_secs: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            waste_bin_interval_secs: 30 * 60,
            camera_interval_secs: 30 * 60,
            iot_interval_secs: 60,
            retry_after_secs: 5 * 60,
        }
    }
}

impl SimulationConfig {
    /// `waste_bin_interval_secs` as a [`Duration`].
    #[must_use]
    pub const fn waste_bin_interval(&self) -> Duration {
        Duration::from_secs(self.waste_bin_interval_secs)
    }

    /// `camera_interval_secs` as a [`Duration`].
    #[must_use]
    pub const fn camera_interval(&self) -> Duration {
        Duration::from_secs(self.camera_interval_secs)
    }

    /// `iot_interval_secs` as a [`Duration`].
    #[must_use]
    pub const fn iot_interval(&self) -> Duration {
        Duration::from_secs(self.iot_interval_secs)
    }

    /// `retry_after_secs` as a [`Duration`].
    #[must_use]
    pub const fn retry_after(&self) -> Duration {
        Duration::from_secs(self.retry_after_secs)
    }
}

/// Configuration for a single region
#[derive(Debug, Clone, Deserialize)]
pub struct RegionSeed {
    /// Region name, the seeding key
    pub name: String,
    /// Center latitude
    pub lat: f64,
    /// Center longitude
    pub lng: f64,
    /// Districts of the region
    #[serde(default)]
    pub districts: Vec<DistrictSeed>,
}

/// Configuration for a single district
#[derive(Debug, Clone, Deserialize)]
pub struct DistrictSeed {
    /// District name, the seeding key within its region
    pub name: String,
    /// Center latitude
    pub lat: f64,
    /// Center longitude
    pub lng: f64,
}

/// Configuration for a single organization
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationSeed {
    /// Display name
    pub name: String,
    /// Organization kind
    #[serde(rename = "type")]
    pub kind: OrganizationType,
    /// Login, the seeding key
    pub login: String,
    /// Initial password, hashed on insert
    pub password: String,
    /// Name of a configured region
    pub region: String,
    /// Name of a configured district
    pub district: String,
    /// Center latitude
    pub lat: f64,
    /// Center longitude
    pub lng: f64,
    /// Modules to enable
    #[serde(default)]
    pub enabled_modules: Vec<Module>,
}

/// Loads the application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if path.exists() {
        load_config(path)
    } else {
        warn!(path = %path.display(), "Config file not found, using defaults");
        Ok(AppConfig::default())
    }
}

/// Login, token sessions and password hashing
pub mod auth;

/// Call center requests, their timelines and the field services handling them
pub mod call_center;

/// Soil moisture sensors, rooms, boilers and facilities
pub mod climate;

/// Construction missions and camera-watched sites
pub mod construction;

/// Dashboard statistics, search and the organization picker
pub mod dashboard;

/// Device health rows owned by boilers and SOS columns
pub mod device_health;

/// Air quality sensors and eco violations
pub mod environment;

/// Coordinates, regions and districts
pub mod geo;

/// IoT device registry, sensor ingestion and provisioning
pub mod iot;

/// Light poles and camera regions of interest
pub mod lighting;

/// Per-user notifications
pub mod notification;

/// Organizations (tenants) and their cascading removal
pub mod organization;

/// Analytics report entries
pub mod report;

/// The CRUD contract shared by REST resources
pub mod resource;

/// SOS columns
pub mod security;

/// Tenant scoping of data access
pub mod tenant;

/// Bus telemetry
pub mod transport;

/// Electricity, water and gas network nodes
pub mod utility;

/// Payload validation helpers
pub mod validation;

/// Waste bins and trucks
pub mod waste;

//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust models.
//! Creation is idempotent (`IF NOT EXISTS`), which lets every CLI command call it
//! on start-up.

use crate::entities::{
    AirSensor, AuthToken, Boiler, BoilerRoom, Bus, CallRequest, CallRequestTimeline,
    ConstructionMission, ConstructionSite, Coordinate, DeviceHealth, District, EcoViolation,
    Facility, FacilityBoiler, IotDevice, LightPole, LightRoi, MoistureSensor, Notification,
    Organization, PoleRoi, Region, ReportEntry, ResponsibleOrg, Room, SiteMission, SosColumn,
    Truck, User, UtilityNode, WasteBin,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::debug;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/smartcity.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!(url = %database_url, "Connecting to database");

    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;
    Ok(())
}

/// Creates all tables, parents before children.
pub async fn create_tables<C: ConnectionTrait>(db: &C) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    // Owned value rows and the administrative hierarchy
    create_table(db, &schema, Coordinate).await?;
    create_table(db, &schema, DeviceHealth).await?;
    create_table(db, &schema, Region).await?;
    create_table(db, &schema, District).await?;
    create_table(db, &schema, Organization).await?;

    // Principals and sessions
    create_table(db, &schema, User).await?;
    create_table(db, &schema, AuthToken).await?;
    create_table(db, &schema, Notification).await?;

    // Waste
    create_table(db, &schema, WasteBin).await?;
    create_table(db, &schema, Truck).await?;

    // Climate
    create_table(db, &schema, MoistureSensor).await?;
    create_table(db, &schema, Room).await?;
    create_table(db, &schema, Boiler).await?;
    create_table(db, &schema, BoilerRoom).await?;
    create_table(db, &schema, Facility).await?;
    create_table(db, &schema, FacilityBoiler).await?;
    create_table(db, &schema, IotDevice).await?;

    // Environment, security, construction, lighting, transport
    create_table(db, &schema, AirSensor).await?;
    create_table(db, &schema, SosColumn).await?;
    create_table(db, &schema, EcoViolation).await?;
    create_table(db, &schema, ConstructionMission).await?;
    create_table(db, &schema, ConstructionSite).await?;
    create_table(db, &schema, SiteMission).await?;
    create_table(db, &schema, LightRoi).await?;
    create_table(db, &schema, LightPole).await?;
    create_table(db, &schema, PoleRoi).await?;
    create_table(db, &schema, Bus).await?;

    // Call center, reporting, utilities
    create_table(db, &schema, ResponsibleOrg).await?;
    create_table(db, &schema, CallRequest).await?;
    create_table(db, &schema, CallRequestTimeline).await?;
    create_table(db, &schema, ReportEntry).await?;
    create_table(db, &schema, UtilityNode).await?;

    debug!("Database schema ready");
    Ok(())
}

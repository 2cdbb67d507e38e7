//! Coordinate entity - A latitude/longitude point.
//!
//! Coordinates are owned one-to-one by the row that references them (a bin's
//! location, a region's center, ...) and are created and deleted with it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Coordinate database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coordinates")]
pub struct Model {
    /// Auto-increment identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

/// Coordinates are referenced by many tables but reference nothing
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

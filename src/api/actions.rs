//! Endpoints that are not plain CRUD: device pushes, manual job triggers,
//! device linking, the dashboard and search.

use super::AppState;
use super::extract::ApiJson;
use crate::core::auth::Session;
use crate::core::dashboard::{self, DashboardStats, SearchResults};
use crate::core::geo::Located;
use crate::core::iot::{self, ReadingInput, SensorReading};
use crate::core::organization::OrganizationView;
use crate::core::validation::REQUIRED;
use crate::core::waste::{self, ImageUpdate};
use crate::entities::{IotDeviceModel, WasteBinModel};
use crate::errors::{Error, Result};
use crate::simulation::waste_bins;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

async fn update_image(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<ImageUpdate>,
) -> Result<Json<Located<WasteBinModel>>> {
    Ok(Json(waste::update_image(&state.db, session.scope(), id, update).await?))
}

async fn analyze_bins(State(state): State<AppState>, _session: Session) -> Result<Json<Value>> {
    let report = waste_bins::analyze_bins(&state.db).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Waste bin analysis completed successfully",
        "analyzed": report.analyzed,
        "changed": report.changed,
    })))
}

async fn ingest_reading(
    State(state): State<AppState>,
    _session: Session,
    ApiJson(input): ApiJson<ReadingInput>,
) -> Result<Json<Value>> {
    let reading = SensorReading::try_from(input)?;
    let device = iot::ingest_reading(&state.db, reading).await?;
    Ok(Json(json!({"success": true, "device": device})))
}

/// Body of the link endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinkTarget {
    /// Room to link the device to
    pub room: Option<Uuid>,
    /// Boiler to link the device to
    pub boiler: Option<Uuid>,
}

async fn link_room(
    State(state): State<AppState>,
    _session: Session,
    Path(id): Path<Uuid>,
    ApiJson(target): ApiJson<LinkTarget>,
) -> Result<Json<Located<IotDeviceModel>>> {
    let room = target.room.ok_or_else(|| Error::field("room", REQUIRED))?;
    Ok(Json(iot::link_to_room(&state.db, id, room).await?))
}

async fn link_boiler(
    State(state): State<AppState>,
    _session: Session,
    Path(id): Path<Uuid>,
    ApiJson(target): ApiJson<LinkTarget>,
) -> Result<Json<Located<IotDeviceModel>>> {
    let boiler = target.boiler.ok_or_else(|| Error::field("boiler", REQUIRED))?;
    Ok(Json(iot::link_to_boiler(&state.db, id, boiler).await?))
}

async fn unlink(
    State(state): State<AppState>,
    _session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Located<IotDeviceModel>>> {
    Ok(Json(iot::unlink(&state.db, id).await?))
}

async fn dashboard_stats(State(state): State<AppState>, session: Session) -> Result<Json<DashboardStats>> {
    Ok(Json(dashboard::stats(&state.db, session.scope()).await?))
}

async fn user_organizations(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<OrganizationView>>> {
    Ok(Json(dashboard::user_organizations(&state.db, session.scope()).await?))
}

/// `?q=&type=`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    /// Search text
    pub q: String,
    /// `organization`, `waste-bin` or `truck`; empty searches everything
    #[serde(rename = "type")]
    pub kind: String,
}

async fn search(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>> {
    Ok(Json(dashboard::search(&state.db, session.scope(), &query.q, &query.kind).await?))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Action endpoints that are not plain CRUD
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/waste-bins/analyze/", post(analyze_bins))
        .route(
            "/waste-bins/{id}/update-image/",
            post(update_image).patch(update_image),
        )
        .route("/iot/update/", post(ingest_reading))
        .route("/iot-devices/{id}/link-room/", post(link_room))
        .route("/iot-devices/{id}/link-boiler/", post(link_boiler))
        .route("/iot-devices/{id}/unlink/", post(unlink))
        .route("/dashboard/stats/", get(dashboard_stats))
        .route("/user/organizations/", get(user_organizations))
        .route("/search/", get(search))
        .route("/health/", get(health))
}

//! Read-only filter endpoints: by zone, type, status or date range.
//!
//! An unknown status or type in the path matches nothing and yields an
//! empty list.

use super::AppState;
use crate::core::auth::Session;
use crate::core::call_center::{self, CallRequestView};
use crate::core::climate::{self, FacilityView};
use crate::core::construction::{self, SiteView};
use crate::core::environment;
use crate::core::geo::{self, Centered, Located};
use crate::core::security::{self, SosColumnView};
use crate::core::transport;
use crate::core::utility;
use crate::core::waste;
use crate::entities::{
    AirSensorModel, BusModel, DistrictModel, EcoViolationModel, TruckModel, UtilityNodeModel,
    WasteBinModel,
};
use crate::errors::{Error, Result};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

/// Parses a path segment as one of the wire names of `T`.
fn parse_value<T: DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_value(Value::String(raw.to_string())).ok()
}

async fn bins_by_hudud(
    State(state): State<AppState>,
    session: Session,
    Path(hudud): Path<String>,
) -> Result<Json<Vec<Located<WasteBinModel>>>> {
    Ok(Json(waste::bins_by_hudud(&state.db, session.scope(), &hudud).await?))
}

async fn trucks_by_hudud(
    State(state): State<AppState>,
    session: Session,
    Path(hudud): Path<String>,
) -> Result<Json<Vec<Located<TruckModel>>>> {
    Ok(Json(waste::trucks_by_hudud(&state.db, session.scope(), &hudud).await?))
}

async fn region_districts(
    State(state): State<AppState>,
    _session: Session,
    Path(region_id): Path<Uuid>,
) -> Result<Json<Vec<Centered<DistrictModel>>>> {
    Ok(Json(geo::districts_of_region(&state.db, region_id).await?))
}

async fn facilities_by_type(
    State(state): State<AppState>,
    _session: Session,
    Path(raw): Path<String>,
) -> Result<Json<Vec<FacilityView>>> {
    let Some(kind) = parse_value(&raw) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(climate::facilities_by_type(&state.db, kind).await?))
}

async fn air_sensors_by_status(
    State(state): State<AppState>,
    session: Session,
    Path(raw): Path<String>,
) -> Result<Json<Vec<Located<AirSensorModel>>>> {
    let Some(status) = parse_value(&raw) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(environment::air_sensors_by_status(&state.db, session.scope(), status).await?))
}

async fn sos_columns_by_status(
    State(state): State<AppState>,
    session: Session,
    Path(raw): Path<String>,
) -> Result<Json<Vec<SosColumnView>>> {
    let Some(status) = parse_value(&raw) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(security::sos_by_status(&state.db, session.scope(), status).await?))
}

async fn sites_by_status(
    State(state): State<AppState>,
    session: Session,
    Path(raw): Path<String>,
) -> Result<Json<Vec<SiteView>>> {
    let Some(status) = parse_value(&raw) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(construction::sites_by_status(&state.db, session.scope(), status).await?))
}

async fn buses_by_status(
    State(state): State<AppState>,
    session: Session,
    Path(raw): Path<String>,
) -> Result<Json<Vec<Located<BusModel>>>> {
    let Some(status) = parse_value(&raw) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(transport::buses_by_status(&state.db, session.scope(), status).await?))
}

async fn call_requests_by_status(
    State(state): State<AppState>,
    _session: Session,
    Path(raw): Path<String>,
) -> Result<Json<Vec<CallRequestView>>> {
    let Some(status) = parse_value(&raw) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(call_center::requests_by_status(&state.db, status).await?))
}

async fn utility_nodes_by_type(
    State(state): State<AppState>,
    session: Session,
    Path(raw): Path<String>,
) -> Result<Json<Vec<Located<UtilityNodeModel>>>> {
    let Some(kind) = parse_value(&raw) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(utility::nodes_by_type(&state.db, session.scope(), kind).await?))
}

async fn utility_nodes_by_status(
    State(state): State<AppState>,
    session: Session,
    Path(raw): Path<String>,
) -> Result<Json<Vec<Located<UtilityNodeModel>>>> {
    let Some(status) = parse_value(&raw) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(utility::nodes_by_status(&state.db, session.scope(), status).await?))
}

/// `?start_date=YYYY-MM-DD&end_date=YYYY-MM-DD`, both optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DateRange {
    /// First day of the range, `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// Last day of the range, `YYYY-MM-DD`
    pub end_date: Option<String>,
}

fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| Error::field(field, "Date has wrong format. Use YYYY-MM-DD.")),
    }
}

async fn violations_by_date_range(
    State(state): State<AppState>,
    session: Session,
    Query(range): Query<DateRange>,
) -> Result<Json<Vec<EcoViolationModel>>> {
    let start = parse_date("start_date", range.start_date.as_deref())?;
    let end = parse_date("end_date", range.end_date.as_deref())?;
    Ok(Json(environment::violations_between(&state.db, session.scope(), start, end).await?))
}

/// Read-only path and query filters
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/waste-bins/hudud/{hudud}/", get(bins_by_hudud))
        .route("/trucks/hudud/{hudud}/", get(trucks_by_hudud))
        .route("/regions/{id}/districts/", get(region_districts))
        .route("/facilities/type/{kind}/", get(facilities_by_type))
        .route("/air-sensors/status/{status}/", get(air_sensors_by_status))
        .route("/sos-columns/status/{status}/", get(sos_columns_by_status))
        .route("/construction-sites/status/{status}/", get(sites_by_status))
        .route("/buses/status/{status}/", get(buses_by_status))
        .route("/call-requests/status/{status}/", get(call_requests_by_status))
        .route("/utility-nodes/type/{kind}/", get(utility_nodes_by_type))
        .route("/utility-nodes/status/{status}/", get(utility_nodes_by_status))
        .route("/eco-violations/date-range/", get(violations_by_date_range))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::sos_column::SosStatus;
    use crate::entities::utility_node::UtilityType;

    #[test]
    fn test_parse_value_uses_wire_names() {
        assert_eq!(parse_value::<UtilityType>("WATER"), Some(UtilityType::Water));
        assert_eq!(parse_value::<UtilityType>("water"), None);
        assert_eq!(parse_value::<SosStatus>("NOPE"), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("start_date", None).unwrap(), None);
        assert_eq!(parse_date("start_date", Some("")).unwrap(), None);
        assert_eq!(
            parse_date("start_date", Some("2024-03-01")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert!(matches!(parse_date("end_date", Some("01.03.2024")), Err(Error::Validation(_))));
    }
}

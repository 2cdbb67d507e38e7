//! HTTP interface.
//!
//! Handlers are thin: they extract the session and payload, call into
//! [`crate::core`] and serialise the result. Errors become responses
//! through the [`IntoResponse`](axum::response::IntoResponse) impl in
//! [`error`].

/// Non-CRUD endpoints: pushes, triggers, dashboard and search
pub mod actions;
/// Login, token validation and logout
pub mod auth;
/// Error to status code mapping
pub mod error;
/// Session and JSON body extractors
pub mod extract;
/// Filter endpoints
pub mod filters;
/// User-addressed notification endpoints
pub mod notifications;
/// Organization endpoints keyed by id or login
pub mod organizations;
/// Generic CRUD routes
pub mod resource;

use crate::config::app::AppConfig;
use crate::core::{
    call_center::{CallRequestTimelines, CallRequests, ResponsibleOrgs},
    climate::{Boilers, Facilities, MoistureSensors, Rooms},
    construction::{ConstructionMissions, ConstructionSites},
    environment::{AirSensors, EcoViolations},
    geo::{Districts, Regions},
    iot::IotDevices,
    lighting::{LightPoles, LightRois},
    report::ReportEntries,
    security::SosColumns,
    transport::Buses,
    utility::UtilityNodes,
    waste::{Trucks, WasteBins},
};
use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// Connection pool
    pub db: DatabaseConnection,
    /// Loaded configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wraps a connection and the loaded configuration.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let span = info_span!("http", method = %request.method(), path = %request.uri().path());
    async move {
        let started = Instant::now();
        let response = next.run(request).await;
        info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis(),
            "Request handled"
        );
        response
    }
    .instrument(span)
    .await
}

/// Every route of the service.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(auth::routes())
        .merge(organizations::routes())
        .merge(notifications::routes())
        .merge(filters::routes())
        .merge(actions::routes())
        .merge(resource::routes::<WasteBins>())
        .merge(resource::routes::<Trucks>())
        .merge(resource::routes::<Regions>())
        .merge(resource::routes::<Districts>())
        .merge(resource::routes::<MoistureSensors>())
        .merge(resource::routes::<Rooms>())
        .merge(resource::routes::<Boilers>())
        .merge(resource::routes::<Facilities>())
        .merge(resource::routes::<AirSensors>())
        .merge(resource::routes::<SosColumns>())
        .merge(resource::routes::<EcoViolations>())
        .merge(resource::routes::<ConstructionMissions>())
        .merge(resource::routes::<ConstructionSites>())
        .merge(resource::routes::<LightRois>())
        .merge(resource::routes::<LightPoles>())
        .merge(resource::routes::<Buses>())
        .merge(resource::routes::<ResponsibleOrgs>())
        .merge(resource::routes::<CallRequests>())
        .merge(resource::routes::<CallRequestTimelines>())
        .merge(resource::routes::<ReportEntries>())
        .merge(resource::routes::<UtilityNodes>())
        .merge(resource::routes::<IotDevices>())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use axum::body::Body;
    use axum::http::{self, Method, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn test_app() -> (Router, DatabaseConnection) {
        let db = setup_test_db().await.unwrap();
        (router(AppState::new(db.clone(), AppConfig::default())), db)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut request = http::Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Token {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(app: &Router, login: &str) -> String {
        let body = json!({"login": login, "password": TEST_PASSWORD}).to_string();
        let (status, value) = send(app, Method::POST, "/auth/login/", None, Some(&body)).await;
        assert_eq!(status, StatusCode::OK, "{value}");
        value["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let (app, _db) = test_app().await;
        let (status, body) = send(&app, Method::GET, "/health/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_login_rejects_bad_password() {
        let (app, db) = test_app().await;
        create_test_organization(&db, "org_a").await.unwrap();

        let body = json!({"login": "org_a", "password": "wrong"}).to_string();
        let (status, value) = send(&app, Method::POST, "/auth/login/", None, Some(&body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(value, json!({"success": false, "message": "Invalid credentials"}));
    }

    #[tokio::test]
    async fn test_validate_and_logout() {
        let (app, db) = test_app().await;
        let org = create_test_organization(&db, "org_a").await.unwrap();
        let token = login(&app, "org_a").await;

        let (status, value) = send(&app, Method::POST, "/auth/validate/", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["valid"], json!(true));
        assert_eq!(value["organization_id"], json!(org.item.id));

        let (status, _) = send(&app, Method::POST, "/auth/logout/", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, value) = send(&app, Method::POST, "/auth/validate/", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(value, json!({"valid": false}));
    }

    #[tokio::test]
    async fn test_resources_require_a_session() {
        let (app, _db) = test_app().await;
        let (status, _) = send(&app, Method::GET, "/waste-bins/", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, Method::GET, "/waste-bins/", Some("bogus"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_and_list_waste_bins() {
        let (app, db) = test_app().await;
        let org = create_test_organization(&db, "org_a").await.unwrap();
        let token = login(&app, "org_a").await;

        let body = json!({
            "address": "Mustaqillik ko'chasi 15",
            "location": {"lat": 40.377, "lng": 71.785},
            "fill_level": 95,
        })
        .to_string();
        let (status, created) = send(&app, Method::POST, "/waste-bins/", Some(&token), Some(&body)).await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        // Owner comes from the session; a high fill level marks the bin full
        assert_eq!(created["organization"], json!(org.item.id));
        assert_eq!(created["is_full"], json!(true));

        let (status, list) = send(&app, Method::GET, "/waste-bins/", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["address"], json!("Mustaqillik ko'chasi 15"));
    }

    #[tokio::test]
    async fn test_other_tenants_rows_are_forbidden() {
        let (app, db) = test_app().await;
        let org_a = create_test_organization(&db, "org_a").await.unwrap();
        create_test_organization(&db, "org_b").await.unwrap();
        let bin = create_test_waste_bin(&db, org_a.item.id, "A street").await.unwrap();
        let token_b = login(&app, "org_b").await;

        let (status, list) = send(&app, Method::GET, "/waste-bins/", Some(&token_b), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, json!([]));

        let uri = format!("/waste-bins/{}/", bin.item.id);
        let (status, _) = send(&app, Method::GET, &uri, Some(&token_b), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token_b), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (app, db) = test_app().await;
        create_test_organization(&db, "org_a").await.unwrap();
        let token = login(&app, "org_a").await;

        let (status, value) = send(&app, Method::POST, "/waste-bins/", Some(&token), Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(value["detail"].is_string());
    }

    #[tokio::test]
    async fn test_validation_errors_are_keyed_by_field() {
        let (app, db) = test_app().await;
        create_test_organization(&db, "org_a").await.unwrap();
        let token = login(&app, "org_a").await;

        let body = json!({"location": {"lat": 40.0, "lng": 71.0}, "fill_level": 150}).to_string();
        let (status, value) = send(&app, Method::POST, "/waste-bins/", Some(&token), Some(&body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(value.get("address").is_some(), "{value}");
        assert!(value.get("fill_level").is_some(), "{value}");
    }

    #[tokio::test]
    async fn test_unknown_status_filter_is_empty() {
        let (app, db) = test_app().await;
        create_test_organization(&db, "org_a").await.unwrap();
        let token = login(&app, "org_a").await;

        let (status, value) = send(&app, Method::GET, "/buses/status/FLYING/", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!([]));
    }
}

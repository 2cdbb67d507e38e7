//! `/auth/` endpoints.

use super::AppState;
use super::extract::ApiJson;
use crate::core::auth::{self, LoginResponse, Session};
use crate::errors::{Error, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

/// Login request body
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    /// Organization login, truck login or admin username
    pub login: String,
    /// Plain-text password
    pub password: String,
}

async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let response = auth::login(&state.db, &state.config.auth, &request.login, &request.password).await?;
    Ok(Json(response))
}

async fn validate(session: Result<Session>) -> Result<Response> {
    match session {
        Ok(session) => {
            let mut body = json!({"valid": true});
            if let Some(organization_id) = session.organization_id {
                body["organization_id"] = json!(organization_id);
            }
            Ok(Json(body).into_response())
        }
        Err(Error::Unauthorized) => Ok((StatusCode::UNAUTHORIZED, Json(json!({"valid": false}))).into_response()),
        Err(e) => Err(e),
    }
}

async fn logout(State(state): State<AppState>, session: Session) -> Result<StatusCode> {
    auth::logout(&state.db, &session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Login, logout and token validation
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login/", post(login))
        .route("/auth/validate/", post(validate))
        .route("/auth/logout/", post(logout))
}

//! `/organizations/`: detail routes take a UUID or a login.

use super::AppState;
use super::extract::ApiJson;
use crate::core::auth::Session;
use crate::core::organization::{self, OrganizationInput, OrganizationView, Organizations};
use crate::core::resource::Resource;
use crate::core::validation::WriteMode;
use crate::errors::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

async fn list(State(state): State<AppState>, session: Session) -> Result<Json<Vec<OrganizationView>>> {
    Ok(Json(Organizations::list(&state.db, session.scope()).await?))
}

async fn create(
    State(state): State<AppState>,
    session: Session,
    ApiJson(input): ApiJson<OrganizationInput>,
) -> Result<(StatusCode, Json<OrganizationView>)> {
    let view = Organizations::create(&state.db, session.scope(), input).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn retrieve(
    State(state): State<AppState>,
    session: Session,
    Path(key): Path<String>,
) -> Result<Json<OrganizationView>> {
    Ok(Json(organization::retrieve_by_key(&state.db, session.scope(), &key).await?))
}

async fn replace(
    State(state): State<AppState>,
    session: Session,
    Path(key): Path<String>,
    ApiJson(input): ApiJson<OrganizationInput>,
) -> Result<Json<OrganizationView>> {
    let view = organization::update_by_key(&state.db, session.scope(), &key, input, WriteMode::Replace).await?;
    Ok(Json(view))
}

async fn patch(
    State(state): State<AppState>,
    session: Session,
    Path(key): Path<String>,
    ApiJson(input): ApiJson<OrganizationInput>,
) -> Result<Json<OrganizationView>> {
    let view = organization::update_by_key(&state.db, session.scope(), &key, input, WriteMode::Patch).await?;
    Ok(Json(view))
}

async fn destroy(State(state): State<AppState>, session: Session, Path(key): Path<String>) -> Result<StatusCode> {
    organization::delete_by_key(&state.db, session.scope(), &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Organization routes, addressed by id or login
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/organizations/", get(list).post(create))
        .route(
            "/organizations/{key}/",
            get(retrieve).put(replace).patch(patch).delete(destroy),
        )
}

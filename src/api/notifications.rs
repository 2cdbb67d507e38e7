//! `/notifications/`: always addressed to the calling user.

use super::AppState;
use super::extract::ApiJson;
use crate::core::auth::Session;
use crate::core::notification::{self, Audience, NotificationInput};
use crate::core::validation::WriteMode;
use crate::entities::NotificationModel;
use crate::errors::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

async fn list(State(state): State<AppState>, session: Session) -> Result<Json<Vec<NotificationModel>>> {
    Ok(Json(notification::list(&state.db, Audience::from(&session)).await?))
}

async fn unread(State(state): State<AppState>, session: Session) -> Result<Json<Vec<NotificationModel>>> {
    Ok(Json(notification::unread(&state.db, Audience::from(&session)).await?))
}

async fn create(
    State(state): State<AppState>,
    session: Session,
    ApiJson(input): ApiJson<NotificationInput>,
) -> Result<(StatusCode, Json<NotificationModel>)> {
    let created = notification::create(&state.db, Audience::from(&session), input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn retrieve(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationModel>> {
    Ok(Json(notification::retrieve(&state.db, Audience::from(&session), id).await?))
}

async fn replace(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<NotificationInput>,
) -> Result<Json<NotificationModel>> {
    let audience = Audience::from(&session);
    Ok(Json(notification::update(&state.db, audience, id, input, WriteMode::Replace).await?))
}

async fn patch(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<NotificationInput>,
) -> Result<Json<NotificationModel>> {
    let audience = Audience::from(&session);
    Ok(Json(notification::update(&state.db, audience, id, input, WriteMode::Patch).await?))
}

async fn destroy(State(state): State<AppState>, session: Session, Path(id): Path<Uuid>) -> Result<StatusCode> {
    notification::delete(&state.db, Audience::from(&session), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_read(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationModel>> {
    Ok(Json(notification::mark_read(&state.db, Audience::from(&session), id).await?))
}

/// Notification routes, all scoped to the calling user
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications/", get(list).post(create))
        .route("/notifications/unread/", get(unread))
        .route(
            "/notifications/{id}/",
            get(retrieve).put(replace).patch(patch).delete(destroy),
        )
        .route("/notifications/{id}/read/", post(mark_read))
}

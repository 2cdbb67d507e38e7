//! Generic list/detail routes for any [`Resource`].

use super::AppState;
use super::extract::ApiJson;
use crate::core::auth::Session;
use crate::core::resource::Resource;
use crate::core::validation::WriteMode;
use crate::errors::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

async fn list<R: Resource>(State(state): State<AppState>, session: Session) -> Result<Json<Vec<R::View>>> {
    Ok(Json(R::list(&state.db, session.scope()).await?))
}

async fn create<R: Resource>(
    State(state): State<AppState>,
    session: Session,
    ApiJson(input): ApiJson<R::Input>,
) -> Result<(StatusCode, Json<R::View>)> {
    let view = R::create(&state.db, session.scope(), input).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn retrieve<R: Resource>(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<R::View>> {
    Ok(Json(R::retrieve(&state.db, session.scope(), id).await?))
}

async fn replace<R: Resource>(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<R::Input>,
) -> Result<Json<R::View>> {
    Ok(Json(
        R::update(&state.db, session.scope(), id, input, WriteMode::Replace).await?,
    ))
}

async fn patch<R: Resource>(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<R::Input>,
) -> Result<Json<R::View>> {
    Ok(Json(
        R::update(&state.db, session.scope(), id, input, WriteMode::Patch).await?,
    ))
}

async fn destroy<R: Resource>(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    R::delete(&state.db, session.scope(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `/<name>/` and `/<name>/{id}/` for `R`.
pub fn routes<R: Resource>() -> Router<AppState> {
    Router::new()
        .route(&format!("/{}/", R::NAME), get(list::<R>).post(create::<R>))
        .route(
            &format!("/{}/{{id}}/", R::NAME),
            get(retrieve::<R>)
                .put(replace::<R>)
                .patch(patch::<R>)
                .delete(destroy::<R>),
        )
}

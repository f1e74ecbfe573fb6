//! Actor handlers.
//!
//! - `POST /api/v1/actors` (`create:actor`)
//! - `GET /api/v1/actors` (`read:actor`)
//! - `GET /api/v1/actors/{id}` (`read:actor`)
//! - `PATCH /api/v1/actors/{id}` (`update:actor`)
//! - `DELETE /api/v1/actors/{id}` (`delete:actor`)

use super::{list_params, parse_body, resource_id};
use crate::errors::ApiError;
use crate::models::{
    ActorDetail, ActorRow, CreateActorRequest, ListQuery, Page, UpdateActorRequest,
};
use crate::repositories::ActorsRepository;
use crate::routes::AppState;
use axum::{
    body::Bytes,
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;

const ACTOR_NOT_FOUND: &str = "Actor not found";

/// Handler for POST /api/v1/actors
///
/// # Response
///
/// - 201 Created: long form of the new actor
/// - 400 Bad Request: unparseable body or invalid field
#[instrument(skip_all, name = "casting.actor.create")]
pub async fn create_actor(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<ActorDetail>), ApiError> {
    let request: CreateActorRequest = parse_body(&body)?;
    let gender = request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let actor = ActorsRepository::create(
        &state.pool,
        request.name.trim(),
        request.age,
        gender,
        request.movies.as_deref(),
    )
    .await?;

    tracing::info!(target: "casting.handlers.actors", actor_id = actor.id, "Actor created");

    let detail = with_movies(&state.pool, actor).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Handler for GET /api/v1/actors
///
/// Query: `page`, `per_page`, `search_term` (ILIKE pattern on name).
#[instrument(skip_all, name = "casting.actor.list")]
pub async fn list_actors(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Page<ActorRow>>, ApiError> {
    let (pagination, search_term) = list_params(query)?;

    let (items, total) =
        ActorsRepository::list(&state.pool, search_term.as_deref(), pagination).await?;

    Ok(Json(Page::new(items, total, pagination)))
}

/// Handler for GET /api/v1/actors/{id}
#[instrument(skip_all, name = "casting.actor.get", fields(actor_id = tracing::field::Empty))]
pub async fn get_actor(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<ActorDetail>, ApiError> {
    let id = resource_id(path, ACTOR_NOT_FOUND)?;
    tracing::Span::current().record("actor_id", id);

    let actor = ActorsRepository::get(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(ACTOR_NOT_FOUND.to_string()))?;

    Ok(Json(with_movies(&state.pool, actor).await?))
}

/// Handler for PATCH /api/v1/actors/{id}
///
/// Absent fields are unchanged; an unrecognized gender is ignored; `movies`
/// replaces the actor's movie links.
#[instrument(skip_all, name = "casting.actor.update", fields(actor_id = tracing::field::Empty))]
pub async fn update_actor(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i32>, PathRejection>,
    body: Bytes,
) -> Result<Json<ActorDetail>, ApiError> {
    let id = resource_id(path, ACTOR_NOT_FOUND)?;
    tracing::Span::current().record("actor_id", id);

    let request: UpdateActorRequest = parse_body(&body)?;
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if request.gender.is_some() && request.gender().is_none() {
        tracing::debug!(target: "casting.handlers.actors", "Ignoring unrecognized gender");
    }

    let actor = ActorsRepository::update(
        &state.pool,
        id,
        request.name.as_deref().map(str::trim),
        request.age,
        request.gender(),
        request.movies.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(ACTOR_NOT_FOUND.to_string()))?;

    Ok(Json(with_movies(&state.pool, actor).await?))
}

/// Handler for DELETE /api/v1/actors/{id}
#[instrument(skip_all, name = "casting.actor.delete", fields(actor_id = tracing::field::Empty))]
pub async fn delete_actor(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = resource_id(path, ACTOR_NOT_FOUND)?;
    tracing::Span::current().record("actor_id", id);

    if !ActorsRepository::delete(&state.pool, id).await? {
        return Err(ApiError::NotFound(ACTOR_NOT_FOUND.to_string()));
    }

    tracing::info!(target: "casting.handlers.actors", actor_id = id, "Actor deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn with_movies(pool: &PgPool, actor: ActorRow) -> Result<ActorDetail, ApiError> {
    let movies = ActorsRepository::movies_for(pool, actor.id).await?;
    Ok(ActorDetail { actor, movies })
}

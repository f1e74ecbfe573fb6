//! Movie handlers.
//!
//! - `POST /api/v1/movies` (`create:movie`)
//! - `GET /api/v1/movies` (`read:movie`)
//! - `GET /api/v1/movies/{id}` (`read:movie`)
//! - `PATCH /api/v1/movies/{id}` (`update:movie`)
//! - `DELETE /api/v1/movies/{id}` (`delete:movie`)

use super::{list_params, parse_body, resource_id};
use crate::errors::ApiError;
use crate::models::{
    CreateMovieRequest, ListQuery, MovieDetail, MovieRow, Page, UpdateMovieRequest,
};
use crate::repositories::MoviesRepository;
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

const MOVIE_NOT_FOUND: &str = "Movie not found";

/// Handler for POST /api/v1/movies
///
/// Body: `{title, release_date: "YYYY-MM-DD", actors?: [id]}`.
#[instrument(skip_all, name = "casting.movie.create")]
pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<MovieDetail>), ApiError> {
    let request: CreateMovieRequest = parse_body(&body)?;
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let movie = MoviesRepository::create(
        &state.pool,
        request.title.trim(),
        request.release_date,
        request.actors.as_deref(),
    )
    .await?;

    tracing::info!(target: "casting.handlers.movies", movie_id = movie.id, "Movie created");

    let detail = with_cast(&state.pool, movie).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Handler for GET /api/v1/movies
#[instrument(skip_all, name = "casting.movie.list")]
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Page<MovieRow>>, ApiError> {
    let (pagination, search_term) = list_params(query)?;

    let (items, total) =
        MoviesRepository::list(&state.pool, search_term.as_deref(), pagination).await?;

    Ok(Json(Page::new(items, total, pagination)))
}

/// Handler for GET /api/v1/movies/{id}
#[instrument(skip_all, name = "casting.movie.get", fields(movie_id = tracing::field::Empty))]
pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<MovieDetail>, ApiError> {
    let id = resource_id(path, MOVIE_NOT_FOUND)?;
    tracing::Span::current().record("movie_id", id);

    let movie = MoviesRepository::get(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(MOVIE_NOT_FOUND.to_string()))?;

    Ok(Json(with_cast(&state.pool, movie).await?))
}

/// Handler for PATCH /api/v1/movies/{id}
#[instrument(skip_all, name = "casting.movie.update", fields(movie_id = tracing::field::Empty))]
pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i32>, PathRejection>,
    body: Bytes,
) -> Result<Json<MovieDetail>, ApiError> {
    let id = resource_id(path, MOVIE_NOT_FOUND)?;
    tracing::Span::current().record("movie_id", id);

    let request: UpdateMovieRequest = parse_body(&body)?;
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let movie = MoviesRepository::update(
        &state.pool,
        id,
        request.title.as_deref().map(str::trim),
        request.release_date,
        request.actors.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(MOVIE_NOT_FOUND.to_string()))?;

    Ok(Json(with_cast(&state.pool, movie).await?))
}

/// Handler for DELETE /api/v1/movies/{id}
#[instrument(skip_all, name = "casting.movie.delete", fields(movie_id = tracing::field::Empty))]
pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = resource_id(path, MOVIE_NOT_FOUND)?;
    tracing::Span::current().record("movie_id", id);

    if !MoviesRepository::delete(&state.pool, id).await? {
        return Err(ApiError::NotFound(MOVIE_NOT_FOUND.to_string()));
    }

    tracing::info!(target: "casting.handlers.movies", movie_id = id, "Movie deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn with_cast(pool: &PgPool, movie: MovieRow) -> Result<MovieDetail, ApiError> {
    let actors = MoviesRepository::actors_for(pool, movie.id).await?;
    Ok(MovieDetail { movie, actors })
}

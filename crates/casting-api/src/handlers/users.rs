//! User handlers.
//!
//! Users are created implicitly on first `GET /api/v1/me`; these handlers
//! cover reading, renaming and removing them.

use super::{list_params, parse_body, resource_id};
use crate::errors::ApiError;
use crate::models::{ListQuery, Page, UpdateUserRequest, UserDetail, UserRow};
use crate::repositories::UsersRepository;
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
use std::sync::Arc;
use tracing::instrument;

const USER_NOT_FOUND: &str = "User not found";

/// Handler for GET /api/v1/users
#[instrument(skip_all, name = "casting.user.list")]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Page<UserRow>>, ApiError> {
    let (pagination, search_term) = list_params(query)?;

    let (items, total) =
        UsersRepository::list(&state.pool, search_term.as_deref(), pagination).await?;

    Ok(Json(Page::new(items, total, pagination)))
}

/// Handler for GET /api/v1/users/{id}
#[instrument(skip_all, name = "casting.user.get", fields(user_id = tracing::field::Empty))]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<UserDetail>, ApiError> {
    let id = resource_id(path, USER_NOT_FOUND)?;
    tracing::Span::current().record("user_id", id);

    let user = UsersRepository::get(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;
    let accounts = UsersRepository::accounts_for(&state.pool, user.id).await?;

    Ok(Json(UserDetail { user, accounts }))
}

/// Handler for PATCH /api/v1/users/{id}
#[instrument(skip_all, name = "casting.user.update", fields(user_id = tracing::field::Empty))]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i32>, PathRejection>,
    body: Bytes,
) -> Result<Json<UserDetail>, ApiError> {
    let id = resource_id(path, USER_NOT_FOUND)?;
    tracing::Span::current().record("user_id", id);

    let request: UpdateUserRequest = parse_body(&body)?;
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let user = UsersRepository::update(&state.pool, id, request.name.as_deref().map(str::trim))
        .await?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;
    let accounts = UsersRepository::accounts_for(&state.pool, user.id).await?;

    Ok(Json(UserDetail { user, accounts }))
}

/// Handler for DELETE /api/v1/users/{id}
///
/// Linked accounts go with the user. A later login by the same subject
/// creates a fresh user.
#[instrument(skip_all, name = "casting.user.delete", fields(user_id = tracing::field::Empty))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = resource_id(path, USER_NOT_FOUND)?;
    tracing::Span::current().record("user_id", id);

    if !UsersRepository::delete(&state.pool, id).await? {
        return Err(ApiError::NotFound(USER_NOT_FOUND.to_string()));
    }

    tracing::info!(target: "casting.handlers.users", user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

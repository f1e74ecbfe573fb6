//! HTTP request handlers.
//!
//! JSON bodies are read as raw bytes and parsed here so that malformed input
//! is a 400 with the standard error body rather than axum's 422.

pub mod actors;
pub mod health;
pub mod me;
pub mod metrics;
pub mod movies;
pub mod users;

pub use actors::{create_actor, delete_actor, get_actor, list_actors, update_actor};
pub use health::{health_check, readiness_check};
pub use me::get_me;
pub use metrics::metrics_handler;
pub use movies::{create_movie, delete_movie, get_movie, list_movies, update_movie};
pub use users::{delete_user, get_user, list_users, update_user};

use crate::errors::ApiError;
use crate::models::{ListQuery, Pagination};
use axum::body::Bytes;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use serde::de::DeserializeOwned;

/// Parse a JSON request body.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "casting.handlers", error = %e, "Invalid request body");
        ApiError::BadRequest("Invalid request body".to_string())
    })
}

/// Validate list query parameters.
pub(crate) fn list_params(
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<(Pagination, Option<String>), ApiError> {
    let Query(query) = query.map_err(|e| {
        tracing::debug!(target: "casting.handlers", error = %e, "Invalid query string");
        ApiError::BadRequest("Invalid query parameters".to_string())
    })?;

    let pagination =
        Pagination::from_query(&query).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let search_term = query.search_term.filter(|s| !s.is_empty());

    Ok((pagination, search_term))
}

/// Extract a numeric path id. A non-numeric id names no resource.
pub(crate) fn resource_id(
    path: Result<Path<i32>, PathRejection>,
    not_found: &str,
) -> Result<i32, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::NotFound(not_found.to_string()))
}

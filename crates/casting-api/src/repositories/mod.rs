//! Repository layer for database operations.
//!
//! Repositories are unit structs with associated async functions taking a
//! `&PgPool`. All SQL is parameterized. Every public operation records one
//! `casting_db_query*` sample.

mod actors;
mod movies;
mod users;

pub use actors::{map_row_to_actor, ActorsRepository};
pub use movies::{map_row_to_movie, MoviesRepository};
pub use users::{map_row_to_user, UsersRepository};

use crate::errors::ApiError;
use crate::observability::metrics;
use std::time::Instant;

/// Record the outcome of a database operation and convert its error.
pub(crate) fn observe<T>(
    operation: &'static str,
    start: Instant,
    result: Result<T, sqlx::Error>,
) -> Result<T, ApiError> {
    let status = if result.is_ok() { "success" } else { "error" };
    metrics::record_db_query(operation, status, start.elapsed());
    result.map_err(|e| ApiError::Database(e.to_string()))
}

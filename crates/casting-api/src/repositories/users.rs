//! Users repository.
//!
//! A user is linked to identity provider subjects through `user_accounts`.
//! `oauth_id` is unique, so a subject resolves to at most one user.

use super::observe;
use crate::errors::ApiError;
use crate::models::{Pagination, UserRow};
use sqlx::{PgPool, Row};
use std::time::Instant;
use tracing::instrument;

/// Users repository for database operations.
pub struct UsersRepository;

impl UsersRepository {
    /// Resolve the user linked to `oauth_id`, creating one if none exists.
    ///
    /// A new user is named after the subject. Returns the user and whether it
    /// was created by this call. Concurrent first calls for the same subject
    /// yield a single user: the loser of the unique-index race rolls back and
    /// re-reads.
    #[instrument(skip_all, name = "casting.repo.find_or_create_user")]
    pub async fn find_or_create_by_oauth_id(
        pool: &PgPool,
        oauth_id: &str,
    ) -> Result<(UserRow, bool), ApiError> {
        let start = Instant::now();

        let result = async {
            if let Some(user) = find_by_oauth_id(pool, oauth_id).await? {
                return Ok((user, false));
            }

            let mut tx = pool.begin().await?;

            let row = sqlx::query("INSERT INTO users (name) VALUES ($1) RETURNING id, name")
                .bind(oauth_id)
                .fetch_one(&mut *tx)
                .await?;
            let user = map_row_to_user(&row);

            let linked = sqlx::query(
                r#"
                INSERT INTO user_accounts (user_id, oauth_id)
                VALUES ($1, $2)
                ON CONFLICT (oauth_id) DO NOTHING
                "#,
            )
            .bind(user.id)
            .bind(oauth_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if linked == 0 {
                tx.rollback().await?;
                let existing = find_by_oauth_id(pool, oauth_id)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?;
                return Ok((existing, false));
            }

            tx.commit().await?;
            Ok::<_, sqlx::Error>((user, true))
        }
        .await;

        let (user, created) = observe("find_or_create_user", start, result)?;
        if created {
            tracing::info!(target: "casting.repo.users", user_id = user.id, "Created user on first login");
        }
        Ok((user, created))
    }

    /// One page of users ordered by id, plus the total match count.
    ///
    /// `search_term` is applied to `name` as a case-insensitive `ILIKE` pattern.
    #[instrument(skip_all, name = "casting.repo.list_users")]
    pub async fn list(
        pool: &PgPool,
        search_term: Option<&str>,
        pagination: Pagination,
    ) -> Result<(Vec<UserRow>, i64), ApiError> {
        let start = Instant::now();

        let result = async {
            let total: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR name ILIKE $1)",
            )
            .bind(search_term)
            .fetch_one(pool)
            .await?;

            let rows = sqlx::query(
                r#"
                SELECT id, name
                FROM users
                WHERE ($1::text IS NULL OR name ILIKE $1)
                ORDER BY id
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(search_term)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(pool)
            .await?;

            Ok::<_, sqlx::Error>((rows.iter().map(map_row_to_user).collect(), total))
        }
        .await;

        observe("list_users", start, result)
    }

    #[instrument(skip_all, name = "casting.repo.get_user", fields(user_id = id))]
    pub async fn get(pool: &PgPool, id: i32) -> Result<Option<UserRow>, ApiError> {
        let start = Instant::now();

        let result = sqlx::query("SELECT id, name FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await;

        Ok(observe("get_user", start, result)?.as_ref().map(map_row_to_user))
    }

    /// Subject identifiers linked to the user.
    #[instrument(skip_all, name = "casting.repo.user_accounts", fields(user_id = user_id))]
    pub async fn accounts_for(pool: &PgPool, user_id: i32) -> Result<Vec<String>, ApiError> {
        let start = Instant::now();

        let result = sqlx::query_scalar(
            "SELECT oauth_id FROM user_accounts WHERE user_id = $1 ORDER BY oauth_id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await;

        observe("user_accounts", start, result)
    }

    /// Rename a user. Returns `None` if the user does not exist.
    #[instrument(skip_all, name = "casting.repo.update_user", fields(user_id = id))]
    pub async fn update(
        pool: &PgPool,
        id: i32,
        name: Option<&str>,
    ) -> Result<Option<UserRow>, ApiError> {
        let start = Instant::now();

        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE($2, name)
            WHERE id = $1
            RETURNING id, name
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .await;

        Ok(observe("update_user", start, result)?.as_ref().map(map_row_to_user))
    }

    /// Delete a user and its account links. Returns `false` if it did not exist.
    #[instrument(skip_all, name = "casting.repo.delete_user", fields(user_id = id))]
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, ApiError> {
        let start = Instant::now();

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await;

        Ok(observe("delete_user", start, result)?.rows_affected() > 0)
    }
}

async fn find_by_oauth_id(pool: &PgPool, oauth_id: &str) -> Result<Option<UserRow>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT u.id, u.name
        FROM users u
        JOIN user_accounts a ON a.user_id = u.id
        WHERE a.oauth_id = $1
        "#,
    )
    .bind(oauth_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(map_row_to_user))
}

/// Map a database row to a `UserRow`.
pub fn map_row_to_user(row: &sqlx::postgres::PgRow) -> UserRow {
    UserRow {
        id: row.get("id"),
        name: row.get("name"),
    }
}

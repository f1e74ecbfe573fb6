//! Actors repository.
//!
//! Movie links live in `actor_movie_pivot`. Linking ignores ids that do not
//! name an existing movie.

use super::movies::map_row_to_movie;
use super::observe;
use crate::errors::ApiError;
use crate::models::{ActorRow, Gender, MovieRow, Pagination};
use sqlx::{PgConnection, PgPool, Row};
use std::time::Instant;
use tracing::instrument;

/// Actors repository for database operations.
pub struct ActorsRepository;

impl ActorsRepository {
    /// Insert an actor and link it to `movie_ids`, in one transaction.
    #[instrument(skip_all, name = "casting.repo.create_actor")]
    pub async fn create(
        pool: &PgPool,
        name: &str,
        age: i32,
        gender: Gender,
        movie_ids: Option<&[i32]>,
    ) -> Result<ActorRow, ApiError> {
        let start = Instant::now();

        let result = async {
            let mut tx = pool.begin().await?;

            let row = sqlx::query(
                r#"
                INSERT INTO actors (name, age, gender)
                VALUES ($1, $2, $3)
                RETURNING id, name, age, gender
                "#,
            )
            .bind(name)
            .bind(age)
            .bind(gender.as_str())
            .fetch_one(&mut *tx)
            .await?;
            let actor = map_row_to_actor(&row);

            if let Some(movie_ids) = movie_ids {
                replace_movie_links(&mut tx, actor.id, movie_ids).await?;
            }

            tx.commit().await?;
            Ok::<_, sqlx::Error>(actor)
        }
        .await;

        observe("create_actor", start, result)
    }

    /// One page of actors ordered by id, plus the total match count.
    ///
    /// `search_term` is applied to `name` as a case-insensitive `ILIKE` pattern.
    #[instrument(skip_all, name = "casting.repo.list_actors")]
    pub async fn list(
        pool: &PgPool,
        search_term: Option<&str>,
        pagination: Pagination,
    ) -> Result<(Vec<ActorRow>, i64), ApiError> {
        let start = Instant::now();

        let result = async {
            let total: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM actors WHERE ($1::text IS NULL OR name ILIKE $1)",
            )
            .bind(search_term)
            .fetch_one(pool)
            .await?;

            let rows = sqlx::query(
                r#"
                SELECT id, name, age, gender
                FROM actors
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

            Ok::<_, sqlx::Error>((rows.iter().map(map_row_to_actor).collect(), total))
        }
        .await;

        observe("list_actors", start, result)
    }

    #[instrument(skip_all, name = "casting.repo.get_actor", fields(actor_id = id))]
    pub async fn get(pool: &PgPool, id: i32) -> Result<Option<ActorRow>, ApiError> {
        let start = Instant::now();

        let result = sqlx::query("SELECT id, name, age, gender FROM actors WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await;

        Ok(observe("get_actor", start, result)?.as_ref().map(map_row_to_actor))
    }

    /// Movies the actor appears in, ordered by id.
    #[instrument(skip_all, name = "casting.repo.actor_movies", fields(actor_id = actor_id))]
    pub async fn movies_for(pool: &PgPool, actor_id: i32) -> Result<Vec<MovieRow>, ApiError> {
        let start = Instant::now();

        let result = sqlx::query(
            r#"
            SELECT m.id, m.title, m.release_date
            FROM movies m
            JOIN actor_movie_pivot p ON p.movie_id = m.id
            WHERE p.actor_id = $1
            ORDER BY m.id
            "#,
        )
        .bind(actor_id)
        .fetch_all(pool)
        .await;

        Ok(observe("actor_movies", start, result)?
            .iter()
            .map(map_row_to_movie)
            .collect())
    }

    /// Apply the given fields. `movie_ids`, when present, replaces all links.
    ///
    /// Returns `None` if the actor does not exist.
    #[instrument(skip_all, name = "casting.repo.update_actor", fields(actor_id = id))]
    pub async fn update(
        pool: &PgPool,
        id: i32,
        name: Option<&str>,
        age: Option<i32>,
        gender: Option<Gender>,
        movie_ids: Option<&[i32]>,
    ) -> Result<Option<ActorRow>, ApiError> {
        let start = Instant::now();

        let result = async {
            let mut tx = pool.begin().await?;

            let row = sqlx::query(
                r#"
                UPDATE actors
                SET name = COALESCE($2, name),
                    age = COALESCE($3, age),
                    gender = COALESCE($4, gender)
                WHERE id = $1
                RETURNING id, name, age, gender
                "#,
            )
            .bind(id)
            .bind(name)
            .bind(age)
            .bind(gender.map(|g| g.as_str()))
            .fetch_optional(&mut *tx)
            .await?;

            let Some(row) = row else {
                tx.rollback().await?;
                return Ok(None);
            };
            let actor = map_row_to_actor(&row);

            if let Some(movie_ids) = movie_ids {
                replace_movie_links(&mut tx, actor.id, movie_ids).await?;
            }

            tx.commit().await?;
            Ok::<_, sqlx::Error>(Some(actor))
        }
        .await;

        observe("update_actor", start, result)
    }

    /// Delete an actor. Returns `false` if it did not exist.
    #[instrument(skip_all, name = "casting.repo.delete_actor", fields(actor_id = id))]
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, ApiError> {
        let start = Instant::now();

        let result = sqlx::query("DELETE FROM actors WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await;

        Ok(observe("delete_actor", start, result)?.rows_affected() > 0)
    }
}

async fn replace_movie_links(
    conn: &mut PgConnection,
    actor_id: i32,
    movie_ids: &[i32],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM actor_movie_pivot WHERE actor_id = $1")
        .bind(actor_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO actor_movie_pivot (actor_id, movie_id)
        SELECT $1, id FROM movies WHERE id = ANY($2)
        ON CONFLICT ON CONSTRAINT actor_movie_unique_participation_key DO NOTHING
        "#,
    )
    .bind(actor_id)
    .bind(movie_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Map a database row to an `ActorRow`.
pub fn map_row_to_actor(row: &sqlx::postgres::PgRow) -> ActorRow {
    ActorRow {
        id: row.get("id"),
        name: row.get("name"),
        age: row.get("age"),
        gender: row.get("gender"),
    }
}

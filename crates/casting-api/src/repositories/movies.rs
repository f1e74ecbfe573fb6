//! Movies repository.

use super::actors::map_row_to_actor;
use super::observe;
use crate::errors::ApiError;
use crate::models::{ActorRow, MovieRow, Pagination};
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool, Row};
use std::time::Instant;
use tracing::instrument;

/// Movies repository for database operations.
pub struct MoviesRepository;

impl MoviesRepository {
    /// Insert a movie and link its cast, in one transaction.
    #[instrument(skip_all, name = "casting.repo.create_movie")]
    pub async fn create(
        pool: &PgPool,
        title: &str,
        release_date: NaiveDate,
        actor_ids: Option<&[i32]>,
    ) -> Result<MovieRow, ApiError> {
        let start = Instant::now();

        let result = async {
            let mut tx = pool.begin().await?;

            let row = sqlx::query(
                r#"
                INSERT INTO movies (title, release_date)
                VALUES ($1, $2)
                RETURNING id, title, release_date
                "#,
            )
            .bind(title)
            .bind(release_date)
            .fetch_one(&mut *tx)
            .await?;
            let movie = map_row_to_movie(&row);

            if let Some(actor_ids) = actor_ids {
                replace_cast(&mut tx, movie.id, actor_ids).await?;
            }

            tx.commit().await?;
            Ok::<_, sqlx::Error>(movie)
        }
        .await;

        observe("create_movie", start, result)
    }

    /// One page of movies ordered by id, plus the total match count.
    ///
    /// `search_term` is applied to `title` as a case-insensitive `ILIKE` pattern.
    #[instrument(skip_all, name = "casting.repo.list_movies")]
    pub async fn list(
        pool: &PgPool,
        search_term: Option<&str>,
        pagination: Pagination,
    ) -> Result<(Vec<MovieRow>, i64), ApiError> {
        let start = Instant::now();

        let result = async {
            let total: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM movies WHERE ($1::text IS NULL OR title ILIKE $1)",
            )
            .bind(search_term)
            .fetch_one(pool)
            .await?;

            let rows = sqlx::query(
                r#"
                SELECT id, title, release_date
                FROM movies
                WHERE ($1::text IS NULL OR title ILIKE $1)
                ORDER BY id
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(search_term)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(pool)
            .await?;

            Ok::<_, sqlx::Error>((rows.iter().map(map_row_to_movie).collect(), total))
        }
        .await;

        observe("list_movies", start, result)
    }

    #[instrument(skip_all, name = "casting.repo.get_movie", fields(movie_id = id))]
    pub async fn get(pool: &PgPool, id: i32) -> Result<Option<MovieRow>, ApiError> {
        let start = Instant::now();

        let result = sqlx::query("SELECT id, title, release_date FROM movies WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await;

        Ok(observe("get_movie", start, result)?.as_ref().map(map_row_to_movie))
    }

    /// The movie's cast, ordered by id.
    #[instrument(skip_all, name = "casting.repo.movie_actors", fields(movie_id = movie_id))]
    pub async fn actors_for(pool: &PgPool, movie_id: i32) -> Result<Vec<ActorRow>, ApiError> {
        let start = Instant::now();

        let result = sqlx::query(
            r#"
            SELECT a.id, a.name, a.age, a.gender
            FROM actors a
            JOIN actor_movie_pivot p ON p.actor_id = a.id
            WHERE p.movie_id = $1
            ORDER BY a.id
            "#,
        )
        .bind(movie_id)
        .fetch_all(pool)
        .await;

        Ok(observe("movie_actors", start, result)?
            .iter()
            .map(map_row_to_actor)
            .collect())
    }

    /// Apply the given fields. `actor_ids`, when present, replaces the cast.
    ///
    /// Returns `None` if the movie does not exist.
    #[instrument(skip_all, name = "casting.repo.update_movie", fields(movie_id = id))]
    pub async fn update(
        pool: &PgPool,
        id: i32,
        title: Option<&str>,
        release_date: Option<NaiveDate>,
        actor_ids: Option<&[i32]>,
    ) -> Result<Option<MovieRow>, ApiError> {
        let start = Instant::now();

        let result = async {
            let mut tx = pool.begin().await?;

            let row = sqlx::query(
                r#"
                UPDATE movies
                SET title = COALESCE($2, title),
                    release_date = COALESCE($3, release_date)
                WHERE id = $1
                RETURNING id, title, release_date
                "#,
            )
            .bind(id)
            .bind(title)
            .bind(release_date)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(row) = row else {
                tx.rollback().await?;
                return Ok(None);
            };
            let movie = map_row_to_movie(&row);

            if let Some(actor_ids) = actor_ids {
                replace_cast(&mut tx, movie.id, actor_ids).await?;
            }

            tx.commit().await?;
            Ok::<_, sqlx::Error>(Some(movie))
        }
        .await;

        observe("update_movie", start, result)
    }

    /// Delete a movie. Returns `false` if it did not exist.
    #[instrument(skip_all, name = "casting.repo.delete_movie", fields(movie_id = id))]
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, ApiError> {
        let start = Instant::now();

        let result = sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await;

        Ok(observe("delete_movie", start, result)?.rows_affected() > 0)
    }
}

async fn replace_cast(
    conn: &mut PgConnection,
    movie_id: i32,
    actor_ids: &[i32],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM actor_movie_pivot WHERE movie_id = $1")
        .bind(movie_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO actor_movie_pivot (actor_id, movie_id)
        SELECT id, $1 FROM actors WHERE id = ANY($2)
        ON CONFLICT ON CONSTRAINT actor_movie_unique_participation_key DO NOTHING
        "#,
    )
    .bind(movie_id)
    .bind(actor_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Map a database row to a `MovieRow`.
pub fn map_row_to_movie(row: &sqlx::postgres::PgRow) -> MovieRow {
    MovieRow {
        id: row.get("id"),
        title: row.get("title"),
        release_date: row.get("release_date"),
    }
}

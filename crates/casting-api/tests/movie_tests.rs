//! Movie endpoint integration tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use casting_test_utils::TestCastingServer;
use serde_json::{json, Value};
use sqlx::PgPool;

async fn seed_actor(pool: &PgPool, name: &str) -> Result<i32> {
    let id: i32 = sqlx::query_scalar(
        "INSERT INTO actors (name, age, gender) VALUES ($1, 40, 'female') RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_movie_with_cast(pool: PgPool) -> Result<()> {
    let actor_id = seed_actor(&pool, "Sandra Bullock").await?;
    let server = TestCastingServer::spawn(pool).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/movies", server.url()))
        .bearer_auth(server.token(&["create:movie"]))
        .json(&json!({"title": "Speed", "release_date": "1994-06-10", "actors": [actor_id]}))
        .send()
        .await?;

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await?;
    assert_eq!(body["title"], "Speed");
    assert_eq!(body["release_date"], "1994-06-10");
    assert_eq!(body["actors"][0]["name"], "Sandra Bullock");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_movie_rejects_bad_date(pool: PgPool) -> Result<()> {
    let server = TestCastingServer::spawn(pool).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/movies", server.url()))
        .bearer_auth(server.token(&["create:movie"]))
        .json(&json!({"title": "Speed", "release_date": "June 1994"}))
        .send()
        .await?;

    assert_eq!(response.status(), 400);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_movie_rejects_blank_title(pool: PgPool) -> Result<()> {
    let server = TestCastingServer::spawn(pool).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/movies", server.url()))
        .bearer_auth(server.token(&["create:movie"]))
        .json(&json!({"title": "   ", "release_date": "1994-06-10"}))
        .send()
        .await?;

    assert_eq!(response.status(), 400);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_movie_lifecycle(pool: PgPool) -> Result<()> {
    let actor_id = seed_actor(&pool, "Laurence Fishburne").await?;
    let server = TestCastingServer::spawn(pool).await?;
    let client = reqwest::Client::new();
    let token = server.token(&["create:movie", "read:movie", "update:movie", "delete:movie"]);

    let created: Value = client
        .post(format!("{}/api/v1/movies", server.url()))
        .bearer_auth(&token)
        .json(&json!({"title": "The Matrx", "release_date": "1999-03-31"}))
        .send()
        .await?
        .json()
        .await?;
    let url = format!("{}/api/v1/movies/{}", server.url(), created["id"]);
    assert_eq!(created["actors"], json!([]));

    let updated: Value = client
        .patch(&url)
        .bearer_auth(&token)
        .json(&json!({"title": "The Matrix", "actors": [actor_id]}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(updated["title"], "The Matrix");
    assert_eq!(updated["release_date"], "1999-03-31");
    assert_eq!(updated["actors"][0]["id"], actor_id);

    let fetched: Value = client.get(&url).bearer_auth(&token).send().await?.json().await?;
    assert_eq!(fetched, updated);

    let deleted = client.delete(&url).bearer_auth(&token).send().await?;
    assert_eq!(deleted.status(), 204);

    let gone = client.get(&url).bearer_auth(&token).send().await?;
    assert_eq!(gone.status(), 404);

    // Deleting a movie drops its cast links but not the actors.
    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM actor_movie_pivot")
        .fetch_one(server.pool())
        .await?;
    assert_eq!(links, 0);
    let actors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM actors")
        .fetch_one(server.pool())
        .await?;
    assert_eq!(actors, 1);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_list_movies_caps_per_page(pool: PgPool) -> Result<()> {
    for i in 0..55 {
        sqlx::query("INSERT INTO movies (title, release_date) VALUES ($1, '2001-01-01')")
            .bind(format!("Movie {i:02}"))
            .execute(&pool)
            .await?;
    }
    let server = TestCastingServer::spawn(pool).await?;

    let page: Value = reqwest::Client::new()
        .get(format!("{}/api/v1/movies?per_page=500", server.url()))
        .bearer_auth(server.token(&["read:movie"]))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(page["items"].as_array().unwrap().len(), 50);
    assert_eq!(page["total_items"], 55);
    assert_eq!(page["pages"], 2);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_missing_movie_is_404(pool: PgPool) -> Result<()> {
    let server = TestCastingServer::spawn(pool).await?;

    let response = reqwest::Client::new()
        .patch(format!("{}/api/v1/movies/999", server.url()))
        .bearer_auth(server.token(&["update:movie"]))
        .json(&json!({"title": "Nothing"}))
        .send()
        .await?;

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "Movie not found");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_non_numeric_movie_id_is_404(pool: PgPool) -> Result<()> {
    let server = TestCastingServer::spawn(pool).await?;

    let response = reqwest::Client::new()
        .delete(format!("{}/api/v1/movies/not-a-number", server.url()))
        .bearer_auth(server.token(&["delete:movie"]))
        .send()
        .await?;

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "Movie not found");

    Ok(())
}

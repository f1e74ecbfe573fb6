//! Actor endpoint integration tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use casting_test_utils::TestCastingServer;
use serde_json::{json, Value};
use sqlx::PgPool;

const ALL_ACTOR: &[&str] = &["create:actor", "read:actor", "update:actor", "delete:actor"];

async fn create_actor(server: &TestCastingServer, body: Value) -> Result<reqwest::Response> {
    Ok(reqwest::Client::new()
        .post(format!("{}/api/v1/actors", server.url()))
        .bearer_auth(server.token(ALL_ACTOR))
        .json(&body)
        .send()
        .await?)
}

async fn seed_movie(pool: &PgPool, title: &str) -> Result<i32> {
    let id: i32 = sqlx::query_scalar(
        "INSERT INTO movies (title, release_date) VALUES ($1, '2020-01-01') RETURNING id",
    )
    .bind(title)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_actor_returns_long_form(pool: PgPool) -> Result<()> {
    let movie_id = seed_movie(&pool, "Speed").await?;
    let server = TestCastingServer::spawn(pool).await?;

    let response = create_actor(
        &server,
        json!({"name": "Keanu Reeves", "age": 59, "gender": "male", "movies": [movie_id, 9999]}),
    )
    .await?;

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await?;
    assert_eq!(body["name"], "Keanu Reeves");
    assert_eq!(body["age"], 59);
    assert_eq!(body["gender"], "male");
    // Unknown movie ids are skipped.
    assert_eq!(body["movies"].as_array().unwrap().len(), 1);
    assert_eq!(body["movies"][0]["title"], "Speed");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_actor_without_permission_is_403(pool: PgPool) -> Result<()> {
    let server = TestCastingServer::spawn(pool).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/actors", server.url()))
        .bearer_auth(server.token(&["read:actor"]))
        .json(&json!({"name": "A", "age": 30, "gender": "female"}))
        .send()
        .await?;

    assert_eq!(response.status(), 403);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM actors")
        .fetch_one(server.pool())
        .await?;
    assert_eq!(count, 0);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_actor_rejects_invalid_gender(pool: PgPool) -> Result<()> {
    let server = TestCastingServer::spawn(pool).await?;

    let response = create_actor(&server, json!({"name": "A", "age": 30, "gender": "robot"})).await?;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "BAD_REQUEST");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_actor_rejects_missing_field(pool: PgPool) -> Result<()> {
    let server = TestCastingServer::spawn(pool).await?;

    let response = create_actor(&server, json!({"name": "A", "gender": "female"})).await?;

    assert_eq!(response.status(), 400);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_list_actors_paginates_and_searches(pool: PgPool) -> Result<()> {
    let server = TestCastingServer::spawn(pool).await?;
    for name in ["Alice Adams", "Bob Brown", "Alicia Keys"] {
        let response =
            create_actor(&server, json!({"name": name, "age": 40, "gender": "other"})).await?;
        assert_eq!(response.status(), 201);
    }
    let client = reqwest::Client::new();

    let page: Value = client
        .get(format!("{}/api/v1/actors?page=2&per_page=2", server.url()))
        .bearer_auth(server.token(&["read:actor"]))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(page["total_items"], 3);
    assert_eq!(page["page"], 2);
    assert_eq!(page["pages"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["items"][0]["name"], "Alicia Keys");

    let search: Value = client
        .get(format!("{}/api/v1/actors?search_term=ali%25", server.url()))
        .bearer_auth(server.token(&["read:actor"]))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(search["total_items"], 2);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_list_actors_rejects_bad_page(pool: PgPool) -> Result<()> {
    let server = TestCastingServer::spawn(pool).await?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/actors?page=0", server.url()))
        .bearer_auth(server.token(&["read:actor"]))
        .send()
        .await?;

    assert_eq!(response.status(), 400);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_missing_actor_is_404(pool: PgPool) -> Result<()> {
    let server = TestCastingServer::spawn(pool).await?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/actors/4242", server.url()))
        .bearer_auth(server.token(&["read:actor"]))
        .send()
        .await?;

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "Actor not found");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_actor_applies_partial_fields(pool: PgPool) -> Result<()> {
    let movie_id = seed_movie(&pool, "The Matrix").await?;
    let server = TestCastingServer::spawn(pool).await?;
    let created: Value = create_actor(
        &server,
        json!({"name": "Carrie", "age": 30, "gender": "female"}),
    )
    .await?
    .json()
    .await?;
    let id = created["id"].as_i64().unwrap();

    let response = reqwest::Client::new()
        .patch(format!("{}/api/v1/actors/{}", server.url(), id))
        .bearer_auth(server.token(&["update:actor"]))
        .json(&json!({"age": 31, "gender": "unknown", "movies": [movie_id]}))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["name"], "Carrie");
    assert_eq!(body["age"], 31);
    // Unrecognized gender leaves the stored value alone.
    assert_eq!(body["gender"], "female");
    assert_eq!(body["movies"][0]["title"], "The Matrix");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_actor(pool: PgPool) -> Result<()> {
    let server = TestCastingServer::spawn(pool).await?;
    let created: Value = create_actor(&server, json!({"name": "Temp", "age": 20, "gender": "male"}))
        .await?
        .json()
        .await?;
    let url = format!("{}/api/v1/actors/{}", server.url(), created["id"]);
    let client = reqwest::Client::new();

    let first = client
        .delete(&url)
        .bearer_auth(server.token(&["delete:actor"]))
        .send()
        .await?;
    assert_eq!(first.status(), 204);

    let second = client
        .delete(&url)
        .bearer_auth(server.token(&["delete:actor"]))
        .send()
        .await?;
    assert_eq!(second.status(), 404);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_each_method_checks_its_own_permission(pool: PgPool) -> Result<()> {
    let server = TestCastingServer::spawn(pool).await?;
    let created: Value = create_actor(&server, json!({"name": "Gate", "age": 20, "gender": "male"}))
        .await?
        .json()
        .await?;
    let url = format!("{}/api/v1/actors/{}", server.url(), created["id"]);
    let client = reqwest::Client::new();
    let read_only = server.token(&["read:actor"]);

    let get = client.get(&url).bearer_auth(&read_only).send().await?;
    assert_eq!(get.status(), 200);

    let delete = client.delete(&url).bearer_auth(&read_only).send().await?;
    assert_eq!(delete.status(), 403);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_unauthenticated_request_is_401(pool: PgPool) -> Result<()> {
    let server = TestCastingServer::spawn(pool).await?;

    let response = reqwest::get(format!("{}/api/v1/actors", server.url())).await?;

    assert_eq!(response.status(), 401);
    assert!(response.headers().contains_key("www-authenticate"));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_non_numeric_actor_id_is_404(pool: PgPool) -> Result<()> {
    let server = TestCastingServer::spawn(pool).await?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/actors/abc", server.url()))
        .bearer_auth(server.token(ALL_ACTOR))
        .send()
        .await?;

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "Actor not found");

    Ok(())
}

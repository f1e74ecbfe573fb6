//! Health check handlers.
//!
//! - `/health`: liveness, returns OK while the process is serving
//! - `/ready`: readiness, checks the database and the JWKS configuration

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler. Checks no dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 200 when the database answers and a JWKS URL is configured,
/// otherwise 503. Keys are fetched on demand by the verifier, not here.
///
/// Error messages are generic; the cause is logged server-side.
#[tracing::instrument(skip_all, name = "casting.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if let Err(e) = sqlx::query("SELECT 1").fetch_one(&state.pool).await {
        tracing::warn!(target: "casting.health", error = %e, "Readiness check failed: database error");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                database: Some("unhealthy"),
                jwks: None,
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    if state.config.jwks_url.is_empty() {
        tracing::warn!(target: "casting.health", "Readiness check failed: JWKS URL not configured");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                database: Some("healthy"),
                jwks: Some("unavailable"),
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            database: Some("healthy"),
            jwks: Some("configured"),
            error: None,
        }),
    )
}

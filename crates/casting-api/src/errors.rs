//! Casting API error types.
//!
//! Every error maps to an HTTP status through `IntoResponse` and is rendered as
//! `{"error": "<message>", "code": "<CODE>"}`. Database and internal faults are
//! logged server-side and replaced with a generic message.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Realm advertised in `WWW-Authenticate` on 401 responses.
const BEARER_CHALLENGE: &str = "Bearer realm=\"casting-api\"";

/// Casting API error type.
///
/// - Unauthenticated, MalformedHeader: 401 Unauthorized
/// - InvalidToken, Forbidden: 403 Forbidden
/// - BadRequest: 400 Bad Request
/// - NotFound: 404 Not Found
/// - ServiceUnavailable: 503 Service Unavailable
/// - Database, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) | ApiError::MalformedHeader(_) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::InvalidToken(_) | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code. Also used as a bounded metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::MalformedHeader(_) => "MALFORMED_HEADER",
            ApiError::InvalidToken(_) => "INVALID_TOKEN",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let message = match self {
            ApiError::Database(err) => {
                tracing::error!(target: "casting.database", error = %err, "Database operation failed");
                "An internal database error occurred".to_string()
            }
            ApiError::Internal(err) => {
                tracing::error!(target: "casting.internal", error = %err, "Internal error");
                "An internal error occurred".to_string()
            }
            ApiError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "casting.availability", reason = %reason, "Service unavailable");
                "Service temporarily unavailable".to_string()
            }
            ApiError::Unauthenticated(msg)
            | ApiError::MalformedHeader(msg)
            | ApiError::InvalidToken(msg)
            | ApiError::Forbidden(msg)
            | ApiError::BadRequest(msg)
            | ApiError::NotFound(msg) => msg,
        };

        let mut response = (
            status,
            Json(ErrorBody {
                error: message,
                code,
            }),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(BEARER_CHALLENGE),
            );
        }

        response
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Database(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ApiError::InvalidToken("expired".to_string()).to_string(),
            "Invalid token: expired"
        );
        assert_eq!(
            ApiError::NotFound("Actor not found".to_string()).to_string(),
            "Not found: Actor not found"
        );
    }

    #[test]
    fn test_status_codes() {
        let s = |e: ApiError| e.status_code().as_u16();
        assert_eq!(s(ApiError::Unauthenticated(String::new())), 401);
        assert_eq!(s(ApiError::MalformedHeader(String::new())), 401);
        assert_eq!(s(ApiError::InvalidToken(String::new())), 403);
        assert_eq!(s(ApiError::Forbidden(String::new())), 403);
        assert_eq!(s(ApiError::BadRequest(String::new())), 400);
        assert_eq!(s(ApiError::NotFound(String::new())), 404);
        assert_eq!(s(ApiError::ServiceUnavailable(String::new())), 503);
        assert_eq!(s(ApiError::Database(String::new())), 500);
        assert_eq!(s(ApiError::Internal(String::new())), 500);
    }

    #[tokio::test]
    async fn test_unauthenticated_sets_www_authenticate() {
        let response =
            ApiError::Unauthenticated("Authorization header is not present.".to_string())
                .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(challenge.starts_with("Bearer realm=\"casting-api\""));

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["code"], "UNAUTHENTICATED");
        assert_eq!(body["error"], "Authorization header is not present.");
    }

    #[tokio::test]
    async fn test_forbidden_has_no_challenge() {
        let response =
            ApiError::Forbidden("You don't have permissions for this action".to_string())
                .into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["code"], "FORBIDDEN");
        assert_eq!(body["error"], "You don't have permissions for this action");
    }

    #[tokio::test]
    async fn test_database_error_is_generic() {
        let response =
            ApiError::Database("relation \"actors\" does not exist".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["code"], "DATABASE_ERROR");
        assert_eq!(body["error"], "An internal database error occurred");
    }

    #[tokio::test]
    async fn test_service_unavailable_is_generic() {
        let response =
            ApiError::ServiceUnavailable("jwks fetch failed".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
        assert_eq!(body["error"], "Service temporarily unavailable");
    }

    #[tokio::test]
    async fn test_not_found_passes_message_through() {
        let response = ApiError::NotFound("Movie not found".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["error"], "Movie not found");
    }
}

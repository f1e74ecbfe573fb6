//! Auth gate for protected routes.
//!
//! Each protected method router gets its own [`AuthGate`] carrying the
//! permission it requires. The gate extracts the bearer token, verifies it,
//! checks the permission and stores the claims in request extensions, where
//! handlers pick them up with `Extension<Claims>`.

use crate::auth::{check_permission, JwtValidator};
use crate::errors::ApiError;
use crate::observability::metrics;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// Middleware state: shared validator plus the permission a route requires.
#[derive(Clone)]
pub struct AuthGate {
    jwt_validator: Arc<JwtValidator>,
    permission: &'static str,
}

impl AuthGate {
    /// Gate that requires `permission`. An empty string only requires a
    /// valid token.
    pub fn new(jwt_validator: Arc<JwtValidator>, permission: &'static str) -> Self {
        Self {
            jwt_validator,
            permission,
        }
    }

    /// Gate that only requires a valid token.
    pub fn authenticated(jwt_validator: Arc<JwtValidator>) -> Self {
        Self::new(jwt_validator, "")
    }

    /// Same validator, different permission.
    pub fn requiring(&self, permission: &'static str) -> Self {
        Self::new(Arc::clone(&self.jwt_validator), permission)
    }
}

/// Pull the raw token out of the `Authorization` header.
///
/// The header must split on whitespace into exactly two parts; the second is
/// the token. The scheme word is not inspected.
///
/// # Errors
///
/// - `ApiError::Unauthenticated` when the header is absent, blank or not
///   visible ASCII
/// - `ApiError::MalformedHeader` when it does not have exactly two parts
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "casting.middleware.auth", "Missing Authorization header");
            ApiError::Unauthenticated("Authorization header is not present.".to_string())
        })?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_scheme), Some(token), None) => Ok(token),
        _ => {
            tracing::debug!(target: "casting.middleware.auth", "Malformed Authorization header");
            Err(ApiError::MalformedHeader(
                "Malformed Authorization header value.".to_string(),
            ))
        }
    }
}

/// Auth gate middleware.
///
/// Extraction, verification and (for a non-empty permission) the permission
/// check run in that order. On success the decoded claims are inserted into
/// request extensions and the wrapped handler runs.
#[instrument(skip_all, name = "casting.middleware.auth", fields(permission = %gate.permission))]
pub async fn require_permission(
    State(gate): State<AuthGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = match authorize(&gate, req.headers()).await {
        Ok(claims) => claims,
        Err(e) => {
            metrics::record_auth_rejection(e.code());
            return Err(e);
        }
    };

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

async fn authorize(
    gate: &AuthGate,
    headers: &HeaderMap,
) -> Result<crate::auth::Claims, ApiError> {
    let token = extract_bearer_token(headers)?;
    let claims = gate.jwt_validator.validate(token).await?;

    if !gate.permission.is_empty() {
        check_permission(gate.permission, &claims)?;
    }

    Ok(claims)
}

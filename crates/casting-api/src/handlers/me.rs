//! Handler for the caller's own profile.

use crate::auth::Claims;
use crate::errors::ApiError;
use crate::models::{MeResponse, UserDetail};
use crate::repositories::UsersRepository;
use crate::routes::AppState;
use axum::{extract::State, Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /api/v1/me
///
/// Resolves the token subject to a user, creating the user on first call.
/// Requires only a valid token; the response echoes the token's permissions.
#[instrument(skip_all, name = "casting.me.get")]
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MeResponse>, ApiError> {
    let (user, created) =
        UsersRepository::find_or_create_by_oauth_id(&state.pool, &claims.sub).await?;
    let accounts = UsersRepository::accounts_for(&state.pool, user.id).await?;

    tracing::debug!(target: "casting.handlers.me", user_id = user.id, created, "Resolved caller");

    Ok(Json(MeResponse {
        user: UserDetail { user, accounts },
        permissions: claims.permissions().to_vec(),
    }))
}

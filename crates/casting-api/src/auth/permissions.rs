//! Permission strings and the permission check applied by the auth gate.

use crate::auth::claims::Claims;
use crate::errors::ApiError;

pub const CREATE_ACTOR: &str = "create:actor";
pub const READ_ACTOR: &str = "read:actor";
pub const UPDATE_ACTOR: &str = "update:actor";
pub const DELETE_ACTOR: &str = "delete:actor";

pub const CREATE_MOVIE: &str = "create:movie";
pub const READ_MOVIE: &str = "read:movie";
pub const UPDATE_MOVIE: &str = "update:movie";
pub const DELETE_MOVIE: &str = "delete:movie";

pub const READ_USER: &str = "read:user";
pub const UPDATE_USER: &str = "update:user";
pub const DELETE_USER: &str = "delete:user";

/// Require `permission` in the token's permissions claim.
///
/// # Errors
///
/// `ApiError::Forbidden` when the claim is missing or does not contain
/// `permission`.
pub fn check_permission(permission: &str, claims: &Claims) -> Result<(), ApiError> {
    if claims.permissions.is_none() {
        tracing::debug!(target: "casting.auth.permissions", required = %permission, "Token has no permissions claim");
        return Err(ApiError::Forbidden(
            "Permissions are not included in JWT".to_string(),
        ));
    }

    if !claims.has_permission(permission) {
        tracing::debug!(target: "casting.auth.permissions", required = %permission, "Permission not granted");
        return Err(ApiError::Forbidden(
            "You don't have permissions for this action".to_string(),
        ));
    }

    Ok(())
}

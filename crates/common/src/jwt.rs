//! JWT helpers shared by the casting services.
//!
//! Everything here runs BEFORE signature verification, so nothing in this
//! module trusts the token contents:
//! - size limit enforced before any decoding
//! - header inspection (`kid` + `alg`) for key lookup
//! - `iat` clock-skew validation after the signature is verified
//! - parsing of the configured asymmetric algorithm allow-list
//!
//! Error messages are deliberately generic. Details go to debug logs.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::Algorithm;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Maximum accepted size of a bearer token in bytes (8KB).
///
/// Auth0 access tokens with a full permission list stay well below 2KB.
/// Anything larger is rejected before base64 decoding.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default tolerance for clock drift between the issuer and this service.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Upper bound for a configured clock skew.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Reasons a token is rejected before (or right after) signature checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    #[error("The access token is invalid or expired")]
    MalformedToken,

    #[error("The access token is invalid or expired")]
    MissingKid,

    /// `alg` is absent, unknown, or not an asymmetric algorithm.
    #[error("The access token is invalid or expired")]
    UnsupportedAlgorithm,

    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

/// The two header fields needed to pick a verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    pub kid: String,
    pub alg: Algorithm,
}

/// Read `kid` and `alg` from an unverified token header.
///
/// The token must have exactly three dot-separated segments. A header whose
/// `alg` is `none` or a symmetric HMAC algorithm is rejected here.
///
/// # Errors
///
/// - `TokenTooLarge` when the token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` for bad structure, base64 or JSON
/// - `MissingKid` when `kid` is absent, empty or not a string
/// - `UnsupportedAlgorithm` when `alg` is not an accepted asymmetric algorithm
pub fn inspect_header(token: &str) -> Result<TokenHeader, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut segments = token.split('.');
    let (Some(header_segment), Some(_), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        tracing::debug!(target: "common.jwt", "Token rejected: expected three segments");
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let alg = header
        .get("alg")
        .and_then(serde_json::Value::as_str)
        .and_then(|name| Algorithm::from_str(name).ok())
        .filter(|alg| is_asymmetric(*alg))
        .ok_or_else(|| {
            tracing::debug!(target: "common.jwt", "Token rejected: unsupported alg header");
            JwtValidationError::UnsupportedAlgorithm
        })?;

    let kid = header
        .get("kid")
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)?;

    Ok(TokenHeader { kid, alg })
}

/// Whether `alg` is verified with a public key.
#[must_use]
pub fn is_asymmetric(alg: Algorithm) -> bool {
    !matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// Parse a comma-separated algorithm list such as `"RS256, ES256"`.
///
/// Blank entries are ignored and duplicates collapse.
///
/// # Errors
///
/// `UnsupportedAlgorithm` when an entry is unknown or symmetric, or when the
/// list is empty.
pub fn parse_algorithms(list: &str) -> Result<Vec<Algorithm>, JwtValidationError> {
    let mut algorithms = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let alg = Algorithm::from_str(name)
            .ok()
            .filter(|alg| is_asymmetric(*alg))
            .ok_or(JwtValidationError::UnsupportedAlgorithm)?;
        if !algorithms.contains(&alg) {
            algorithms.push(alg);
        }
    }

    if algorithms.is_empty() {
        return Err(JwtValidationError::UnsupportedAlgorithm);
    }
    Ok(algorithms)
}

/// Reject tokens issued more than `clock_skew` in the future.
///
/// # Errors
///
/// `IatTooFarInFuture` when `iat > now + clock_skew`.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    validate_iat_at(iat, clock_skew, chrono::Utc::now().timestamp())
}

pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Bounded by MAX_CLOCK_SKEW, fits in i64
    #[allow(clippy::cast_possible_wrap)]
    let max_iat = now + clock_skew.as_secs() as i64;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

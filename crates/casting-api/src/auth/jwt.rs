//! Access token verification.
//!
//! Tokens are checked in this order:
//! 1. size limit and header shape (`kid`, asymmetric `alg`)
//! 2. `alg` is in the configured allow-list
//! 3. key lookup in the JWKS cache
//! 4. key type and declared algorithm agree with the header
//! 5. signature, `exp`, `aud` and (when configured) `iss`
//! 6. `iat` not too far in the future
//!
//! Every failure surfaces as the same generic `InvalidToken` message.

use crate::auth::claims::Claims;
use crate::auth::jwks::{Jwk, JwksClient};
use crate::errors::ApiError;
use common::jwt::{inspect_header, validate_iat};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

const INVALID_TOKEN: &str = "The access token is invalid or expired";

fn invalid_token() -> ApiError {
    ApiError::InvalidToken(INVALID_TOKEN.to_string())
}

/// Verifies bearer tokens against the provider's published keys.
pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,
    audience: String,
    issuer: Option<String>,
    algorithms: Vec<Algorithm>,
    clock_skew_seconds: i64,
}

impl JwtValidator {
    /// Create a validator.
    ///
    /// # Arguments
    ///
    /// * `jwks_client` - Shared key cache
    /// * `audience` - Required `aud` value
    /// * `algorithms` - Accepted signing algorithms
    /// * `clock_skew_seconds` - Leeway for `exp`/`nbf` and the `iat` check
    pub fn new(
        jwks_client: Arc<JwksClient>,
        audience: String,
        algorithms: Vec<Algorithm>,
        clock_skew_seconds: i64,
    ) -> Self {
        Self {
            jwks_client,
            audience,
            issuer: None,
            algorithms,
            clock_skew_seconds,
        }
    }

    /// Also require `iss` to equal `issuer`.
    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    /// Validate a token and return its claims.
    ///
    /// # Errors
    ///
    /// - `ApiError::InvalidToken` for every verification failure
    /// - `ApiError::ServiceUnavailable` when the key set cannot be fetched
    #[instrument(skip_all, name = "casting.auth.jwt.validate")]
    pub async fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let header = inspect_header(token).map_err(|e| {
            tracing::debug!(target: "casting.auth.jwt", error = ?e, "Token header rejected");
            invalid_token()
        })?;

        if !self.algorithms.contains(&header.alg) {
            tracing::debug!(target: "casting.auth.jwt", alg = ?header.alg, "Token algorithm not allowed");
            return Err(invalid_token());
        }

        let jwk = self.jwks_client.get_key(&header.kid).await?;

        let claims = self.verify_token(token, &jwk, header.alg)?;

        if let Some(iat) = claims.iat {
            let skew = Duration::from_secs(self.clock_skew_seconds.unsigned_abs());
            if let Err(e) = validate_iat(iat, skew) {
                tracing::debug!(target: "casting.auth.jwt", error = ?e, "Token iat validation failed");
                return Err(invalid_token());
            }
        }

        tracing::debug!(target: "casting.auth.jwt", "Token validated successfully");
        Ok(claims)
    }

    fn verify_token(&self, token: &str, jwk: &Jwk, alg: Algorithm) -> Result<Claims, ApiError> {
        if let Some(declared) = jwk.alg.as_deref() {
            if Algorithm::from_str(declared).ok() != Some(alg) {
                tracing::debug!(target: "casting.auth.jwt", declared = %declared, "JWK algorithm does not match token");
                return Err(invalid_token());
            }
        }

        let decoding_key = decoding_key(jwk, alg)?;

        let mut validation = Validation::new(alg);
        validation.validate_exp = true;
        validation.leeway = self.clock_skew_seconds.unsigned_abs();
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);
        validation.set_audience(&[&self.audience]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(target: "casting.auth.jwt", error = %e, "Token verification failed");
            invalid_token()
        })?;

        Ok(token_data.claims)
    }
}

/// Build a verification key from a JWK for the given algorithm.
///
/// The key type must belong to the algorithm's family.
fn decoding_key(jwk: &Jwk, alg: Algorithm) -> Result<DecodingKey, ApiError> {
    let key = match (jwk.kty.as_str(), alg) {
        (
            "RSA",
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512,
        ) => match (&jwk.n, &jwk.e) {
            (Some(n), Some(e)) => DecodingKey::from_rsa_components(n, e),
            _ => return Err(malformed_jwk(jwk)),
        },
        ("EC", Algorithm::ES256 | Algorithm::ES384) => match (&jwk.x, &jwk.y) {
            (Some(x), Some(y)) => DecodingKey::from_ec_components(x, y),
            _ => return Err(malformed_jwk(jwk)),
        },
        ("OKP", Algorithm::EdDSA) if jwk.crv.as_deref().map_or(true, |c| c == "Ed25519") => {
            match &jwk.x {
                Some(x) => DecodingKey::from_ed_components(x),
                None => return Err(malformed_jwk(jwk)),
            }
        }
        (kty, alg) => {
            tracing::debug!(target: "casting.auth.jwt", kty = %kty, alg = ?alg, "JWK type does not match token algorithm");
            return Err(invalid_token());
        }
    };

    key.map_err(|e| {
        tracing::warn!(target: "casting.auth.jwt", error = %e, "Invalid public key material in JWK");
        invalid_token()
    })
}

fn malformed_jwk(jwk: &Jwk) -> ApiError {
    tracing::warn!(target: "casting.auth.jwt", kty = %jwk.kty, "JWK missing key material");
    invalid_token()
}

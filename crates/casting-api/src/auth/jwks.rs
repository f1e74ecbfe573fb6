//! JWKS client for fetching and caching the identity provider's public keys.
//!
//! Keys are fetched from `/.well-known/jwks.json` on first use and cached for
//! a configurable TTL. A token signed with a `kid` missing from a still-valid
//! cache forces one early refresh (the provider may have rotated keys), at
//! most once per `min_refresh_interval`.
//!
//! Concurrent refreshes are serialized by `refresh_lock`; waiters re-check the
//! cache after acquiring it so a burst of cold requests fetches once.

use crate::config::MAX_JWKS_CACHE_TTL_SECONDS;
use crate::errors::ApiError;
use crate::observability::metrics;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Timeout for a single JWKS fetch.
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest time a fetched key set is trusted.
const MAX_CACHE_TTL: Duration = Duration::from_secs(MAX_JWKS_CACHE_TTL_SECONDS);

/// JSON Web Key as published by the identity provider.
///
/// Only the members needed to build a verification key are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type: `RSA`, `EC` or `OKP`.
    pub kty: String,

    #[serde(default)]
    pub kid: Option<String>,

    #[serde(default)]
    pub alg: Option<String>,

    /// Key use. Only `sig` keys (or keys without `use`) are cached.
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Curve name for `EC` and `OKP` keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// `EC` x coordinate or `OKP` public key (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// `EC` y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

struct CachedJwks {
    keys: HashMap<String, Jwk>,
    fetched_at: Instant,
    expires_at: Instant,
}

/// Outcome of a cache lookup.
#[derive(Debug)]
enum Lookup {
    Hit(Jwk),
    /// Cache is valid, the key is absent, and a refresh happened too recently.
    Unknown,
    NeedsRefresh,
}

/// Thread-safe JWKS client shared by every request.
pub struct JwksClient {
    jwks_url: String,
    http_client: reqwest::Client,
    cache: Arc<RwLock<Option<CachedJwks>>>,
    refresh_lock: Mutex<()>,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
}

impl JwksClient {
    /// Create a JWKS client.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL of the provider's JWKS endpoint
    /// * `cache_ttl` - How long a fetched key set stays valid, capped at one
    ///   day
    /// * `min_refresh_interval` - Minimum spacing between forced refreshes
    ///   triggered by unknown key IDs
    pub fn new(jwks_url: String, cache_ttl: Duration, min_refresh_interval: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "casting.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            refresh_lock: Mutex::new(()),
            cache_ttl: cache_ttl.min(MAX_CACHE_TTL),
            min_refresh_interval,
        }
    }

    /// Get a JWK by key ID, fetching the key set when needed.
    ///
    /// # Errors
    ///
    /// - `ApiError::ServiceUnavailable` if the key set cannot be fetched
    /// - `ApiError::InvalidToken` if no key with this ID exists
    #[instrument(skip_all, name = "casting.auth.jwks.get_key")]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, ApiError> {
        match self.lookup(kid).await {
            Lookup::Hit(key) => return Ok(key),
            Lookup::Unknown => return Err(unknown_kid()),
            Lookup::NeedsRefresh => {}
        }

        let _guard = self.refresh_lock.lock().await;

        // Another request may have refreshed while this one waited.
        match self.lookup(kid).await {
            Lookup::Hit(key) => return Ok(key),
            Lookup::Unknown => return Err(unknown_kid()),
            Lookup::NeedsRefresh => {}
        }

        self.refresh_cache().await?;

        match self.lookup(kid).await {
            Lookup::Hit(key) => Ok(key),
            Lookup::Unknown | Lookup::NeedsRefresh => {
                tracing::warn!(target: "casting.auth.jwks", "Key not found in JWKS after refresh");
                Err(unknown_kid())
            }
        }
    }

    async fn lookup(&self, kid: &str) -> Lookup {
        let cache = self.cache.read().await;
        classify(cache.as_ref(), kid, Instant::now(), self.min_refresh_interval)
    }

    /// Fetch the key set and replace the cache.
    async fn refresh_cache(&self) -> Result<(), ApiError> {
        tracing::debug!(target: "casting.auth.jwks", url = %self.jwks_url, "Fetching JWKS");
        let start = Instant::now();

        let result = self.fetch().await;
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_jwks_refresh(status, start.elapsed());

        let jwks = result?;
        let keys = index_signing_keys(jwks.keys);

        tracing::info!(
            target: "casting.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        let now = Instant::now();
        // Unreachable with the capped TTL; an expired entry only forces a refetch.
        let expires_at = now.checked_add(self.cache_ttl).unwrap_or(now);
        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys,
            fetched_at: now,
            expires_at,
        });

        Ok(())
    }

    async fn fetch(&self) -> Result<JwksResponse, ApiError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "casting.auth.jwks", error = %e, "Failed to fetch JWKS");
                ApiError::ServiceUnavailable("Authentication service unavailable".to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "casting.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(ApiError::ServiceUnavailable(
                "Authentication service unavailable".to_string(),
            ));
        }

        response.json().await.map_err(|e| {
            tracing::error!(target: "casting.auth.jwks", error = %e, "Failed to parse JWKS response");
            ApiError::ServiceUnavailable("Authentication service unavailable".to_string())
        })
    }
}

fn unknown_kid() -> ApiError {
    ApiError::InvalidToken("The access token is invalid or expired".to_string())
}

fn classify(
    cache: Option<&CachedJwks>,
    kid: &str,
    now: Instant,
    min_refresh_interval: Duration,
) -> Lookup {
    let Some(cached) = cache else {
        return Lookup::NeedsRefresh;
    };

    if cached.expires_at <= now {
        return Lookup::NeedsRefresh;
    }

    match cached.keys.get(kid) {
        Some(key) => {
            tracing::debug!(target: "casting.auth.jwks", "JWKS cache hit");
            Lookup::Hit(key.clone())
        }
        None if now.duration_since(cached.fetched_at) >= min_refresh_interval => {
            tracing::debug!(target: "casting.auth.jwks", "Unknown kid, refreshing JWKS");
            Lookup::NeedsRefresh
        }
        None => {
            tracing::debug!(target: "casting.auth.jwks", "Unknown kid, refresh rate limited");
            Lookup::Unknown
        }
    }
}

/// Keep signing keys that carry a `kid`, indexed by it.
fn index_signing_keys(keys: Vec<Jwk>) -> HashMap<String, Jwk> {
    keys.into_iter()
        .filter(|key| key.key_use.as_deref().map_or(true, |u| u == "sig"))
        .filter_map(|key| key.kid.clone().map(|kid| (kid, key)))
        .collect()
}

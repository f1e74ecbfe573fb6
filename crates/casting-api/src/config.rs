//! Casting API configuration.
//!
//! Configuration is loaded from environment variables. The database URL is
//! redacted in Debug output.

use common::jwt::{parse_algorithms, DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default JWKS cache lifetime in seconds.
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 600;

/// Default minimum spacing between forced JWKS refreshes for unknown key IDs.
pub const DEFAULT_JWKS_MIN_REFRESH_INTERVAL_SECONDS: u64 = 30;

/// Upper bound for `JWKS_CACHE_TTL_SECONDS` (one day).
pub const MAX_JWKS_CACHE_TTL_SECONDS: u64 = 86_400;

/// Upper bound for `JWKS_MIN_REFRESH_INTERVAL_SECONDS` (one hour).
pub const MAX_JWKS_MIN_REFRESH_INTERVAL_SECONDS: u64 = 3_600;

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Casting API configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Identity provider domain, e.g. `casting.eu.auth0.com`.
    pub auth0_domain: String,

    /// Expected `aud` claim.
    pub api_audience: String,

    /// Expected `iss` claim. Issuer is not checked when unset.
    pub issuer: Option<String>,

    /// Accepted signing algorithms (asymmetric only).
    pub jwt_algorithms: Vec<Algorithm>,

    /// JWKS endpoint. Defaults to `https://{auth0_domain}/.well-known/jwks.json`.
    pub jwks_url: String,

    pub jwks_cache_ttl_seconds: u64,

    pub jwks_min_refresh_interval_seconds: u64,

    /// JWT clock skew tolerance in seconds (1..=600).
    pub jwt_clock_skew_seconds: i64,

    /// Seconds to keep serving in-flight requests after a shutdown signal.
    pub drain_seconds: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("auth0_domain", &self.auth0_domain)
            .field("api_audience", &self.api_audience)
            .field("issuer", &self.issuer)
            .field("jwt_algorithms", &self.jwt_algorithms)
            .field("jwks_url", &self.jwks_url)
            .field("jwks_cache_ttl_seconds", &self.jwks_cache_ttl_seconds)
            .field(
                "jwks_min_refresh_interval_seconds",
                &self.jwks_min_refresh_interval_seconds,
            )
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT algorithm configuration: {0}")]
    InvalidJwtAlgorithms(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS cache configuration: {0}")]
    InvalidJwksCache(String),

    #[error("Invalid drain period: {0}")]
    InvalidDrainSeconds(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = required(vars, "DATABASE_URL")?;
        let auth0_domain = required(vars, "AUTH0_DOMAIN")?;
        let api_audience = required(vars, "AUTH0_API_AUDIENCE")?;
        let algorithms_raw = required(vars, "JWT_ALGORITHMS")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwt_algorithms = parse_algorithms(&algorithms_raw).map_err(|_| {
            ConfigError::InvalidJwtAlgorithms(format!(
                "JWT_ALGORITHMS must list asymmetric algorithms (e.g. RS256), got '{}'",
                algorithms_raw
            ))
        })?;

        let issuer = vars
            .get("AUTH0_ISSUER")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let jwks_url = vars
            .get("JWKS_URL")
            .cloned()
            .unwrap_or_else(|| format!("https://{}/.well-known/jwks.json", auth0_domain));

        let jwks_cache_ttl_seconds = parse_u64(
            vars,
            "JWKS_CACHE_TTL_SECONDS",
            DEFAULT_JWKS_CACHE_TTL_SECONDS,
            ConfigError::InvalidJwksCache,
        )?;
        if jwks_cache_ttl_seconds == 0 {
            return Err(ConfigError::InvalidJwksCache(
                "JWKS_CACHE_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }
        if jwks_cache_ttl_seconds > MAX_JWKS_CACHE_TTL_SECONDS {
            return Err(ConfigError::InvalidJwksCache(format!(
                "JWKS_CACHE_TTL_SECONDS must not exceed {} seconds, got {}",
                MAX_JWKS_CACHE_TTL_SECONDS, jwks_cache_ttl_seconds
            )));
        }

        let jwks_min_refresh_interval_seconds = parse_u64(
            vars,
            "JWKS_MIN_REFRESH_INTERVAL_SECONDS",
            DEFAULT_JWKS_MIN_REFRESH_INTERVAL_SECONDS,
            ConfigError::InvalidJwksCache,
        )?;
        if jwks_min_refresh_interval_seconds > MAX_JWKS_MIN_REFRESH_INTERVAL_SECONDS {
            return Err(ConfigError::InvalidJwksCache(format!(
                "JWKS_MIN_REFRESH_INTERVAL_SECONDS must not exceed {} seconds, got {}",
                MAX_JWKS_MIN_REFRESH_INTERVAL_SECONDS, jwks_min_refresh_interval_seconds
            )));
        }

        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        let drain_seconds = parse_u64(
            vars,
            "CASTING_DRAIN_SECONDS",
            DEFAULT_DRAIN_SECONDS,
            ConfigError::InvalidDrainSeconds,
        )?;

        Ok(Config {
            database_url,
            bind_address,
            auth0_domain,
            api_audience,
            issuer,
            jwt_algorithms,
            jwks_url,
            jwks_cache_ttl_seconds,
            jwks_min_refresh_interval_seconds,
            jwt_clock_skew_seconds,
            drain_seconds,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_u64(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    to_error: fn(String) -> ConfigError,
) -> Result<u64, ConfigError> {
    match vars.get(name) {
        Some(value_str) => value_str.parse().map_err(|e| {
            to_error(format!(
                "{} must be a valid non-negative integer, got '{}': {}",
                name, value_str, e
            ))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://localhost/casting_test".to_string(),
            ),
            ("AUTH0_DOMAIN".to_string(), "casting.eu.auth0.com".to_string()),
            ("AUTH0_API_AUDIENCE".to_string(), "casting".to_string()),
            ("JWT_ALGORITHMS".to_string(), "RS256".to_string()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.database_url, "postgresql://localhost/casting_test");
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.auth0_domain, "casting.eu.auth0.com");
        assert_eq!(config.api_audience, "casting");
        assert_eq!(config.issuer, None);
        assert_eq!(config.jwt_algorithms, vec![Algorithm::RS256]);
        assert_eq!(
            config.jwks_url,
            "https://casting.eu.auth0.com/.well-known/jwks.json"
        );
        assert_eq!(config.jwks_cache_ttl_seconds, 600);
        assert_eq!(config.jwks_min_refresh_interval_seconds, 30);
        assert_eq!(config.jwt_clock_skew_seconds, 300);
        assert_eq!(config.drain_seconds, 30);
    }

    #[test]
    fn test_from_vars_overrides() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert(
            "AUTH0_ISSUER".to_string(),
            "https://casting.eu.auth0.com/".to_string(),
        );
        vars.insert("JWT_ALGORITHMS".to_string(), "RS256, EdDSA".to_string());
        vars.insert(
            "JWKS_URL".to_string(),
            "http://127.0.0.1:4000/jwks.json".to_string(),
        );
        vars.insert("JWKS_CACHE_TTL_SECONDS".to_string(), "60".to_string());
        vars.insert(
            "JWKS_MIN_REFRESH_INTERVAL_SECONDS".to_string(),
            "0".to_string(),
        );
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "120".to_string());
        vars.insert("CASTING_DRAIN_SECONDS".to_string(), "0".to_string());

        let config = Config::from_vars(&vars).unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(
            config.issuer.as_deref(),
            Some("https://casting.eu.auth0.com/")
        );
        assert_eq!(
            config.jwt_algorithms,
            vec![Algorithm::RS256, Algorithm::EdDSA]
        );
        assert_eq!(config.jwks_url, "http://127.0.0.1:4000/jwks.json");
        assert_eq!(config.jwks_cache_ttl_seconds, 60);
        assert_eq!(config.jwks_min_refresh_interval_seconds, 0);
        assert_eq!(config.jwt_clock_skew_seconds, 120);
        assert_eq!(config.drain_seconds, 0);
    }

    #[test]
    fn test_missing_required_vars() {
        for name in [
            "DATABASE_URL",
            "AUTH0_DOMAIN",
            "AUTH0_API_AUDIENCE",
            "JWT_ALGORITHMS",
        ] {
            let mut vars = base_vars();
            vars.remove(name);
            let result = Config::from_vars(&vars);
            assert!(
                matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == name),
                "expected MissingEnvVar({name}), got {result:?}"
            );
        }
    }

    #[test]
    fn test_blank_required_var_is_missing() {
        let mut vars = base_vars();
        vars.insert("AUTH0_API_AUDIENCE".to_string(), "  ".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::MissingEnvVar(_))
        ));
    }

    #[test]
    fn test_symmetric_algorithm_rejected() {
        let mut vars = base_vars();
        vars.insert("JWT_ALGORITHMS".to_string(), "RS256,HS256".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwtAlgorithms(_))
        ));
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let mut vars = base_vars();
        vars.insert("JWT_ALGORITHMS".to_string(), "RS999".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwtAlgorithms(_))
        ));
    }

    #[test]
    fn test_blank_issuer_is_unset() {
        let mut vars = base_vars();
        vars.insert("AUTH0_ISSUER".to_string(), String::new());
        assert_eq!(Config::from_vars(&vars).unwrap().issuer, None);
    }

    #[test]
    fn test_clock_skew_bounds() {
        for (value, ok) in [
            ("1", true),
            ("600", true),
            ("0", false),
            ("-5", false),
            ("601", false),
            ("abc", false),
        ] {
            let mut vars = base_vars();
            vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), value.to_string());
            let result = Config::from_vars(&vars);
            if ok {
                assert!(result.is_ok(), "skew {value} should be accepted");
            } else {
                assert!(
                    matches!(result, Err(ConfigError::InvalidJwtClockSkew(_))),
                    "skew {value} should be rejected"
                );
            }
        }
    }

    #[test]
    fn test_zero_cache_ttl_rejected() {
        let mut vars = base_vars();
        vars.insert("JWKS_CACHE_TTL_SECONDS".to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwksCache(_))
        ));
    }

    #[test]
    fn test_cache_ttl_upper_bound() {
        for (value, ok) in [
            ("86400", true),
            ("86401", false),
            ("18446744073709551615", false),
        ] {
            let mut vars = base_vars();
            vars.insert("JWKS_CACHE_TTL_SECONDS".to_string(), value.to_string());
            let result = Config::from_vars(&vars);
            if ok {
                assert!(result.is_ok(), "ttl {value} should be accepted");
            } else {
                assert!(
                    matches!(result, Err(ConfigError::InvalidJwksCache(_))),
                    "ttl {value} should be rejected"
                );
            }
        }
    }

    #[test]
    fn test_refresh_interval_upper_bound() {
        let mut vars = base_vars();
        vars.insert(
            "JWKS_MIN_REFRESH_INTERVAL_SECONDS".to_string(),
            "3600".to_string(),
        );
        assert!(Config::from_vars(&vars).is_ok());

        vars.insert(
            "JWKS_MIN_REFRESH_INTERVAL_SECONDS".to_string(),
            "3601".to_string(),
        );
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwksCache(_))
        ));
    }

    #[test]
    fn test_non_numeric_refresh_interval_rejected() {
        let mut vars = base_vars();
        vars.insert(
            "JWKS_MIN_REFRESH_INTERVAL_SECONDS".to_string(),
            "soon".to_string(),
        );
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwksCache(_))
        ));
    }

    #[test]
    fn test_non_numeric_drain_rejected() {
        let mut vars = base_vars();
        vars.insert("CASTING_DRAIN_SECONDS".to_string(), "-1".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidDrainSeconds(_))
        ));
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let mut vars = base_vars();
        vars.insert(
            "DATABASE_URL".to_string(),
            "postgresql://casting:hunter2@db/casting".to_string(),
        );
        let config = Config::from_vars(&vars).unwrap();
        let debug = format!("{:?}", config);

        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}

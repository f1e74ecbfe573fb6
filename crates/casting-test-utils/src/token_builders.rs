//! Builder for test token claims.

use chrono::{Duration, Utc};
use serde_json::json;

/// Audience the test server is configured with.
pub const TEST_AUDIENCE: &str = "casting-api-test";

/// Builder for JWT claims in the identity provider's shape.
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_user("auth0|alice")
///     .with_permissions(&["read:actor"])
///     .build();
/// let token = keypair.sign(&claims)?;
/// ```
pub struct TestTokenBuilder {
    sub: String,
    aud: String,
    iss: Option<String>,
    exp: i64,
    iat: i64,
    permissions: Option<Vec<String>>,
}

impl TestTokenBuilder {
    /// Defaults: valid for an hour, test audience, no permissions claim.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "auth0|test-user".to_string(),
            aud: TEST_AUDIENCE.to_string(),
            iss: None,
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            permissions: None,
        }
    }

    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    pub fn with_audience(mut self, audience: &str) -> Self {
        self.aud = audience.to_string();
        self
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.iss = Some(issuer.to_string());
        self
    }

    /// Set the permissions claim. An empty slice yields an empty array.
    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = Some(permissions.iter().map(|p| (*p).to_string()).collect());
        self
    }

    /// Set expiration in seconds from now; negative values are in the past.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> serde_json::Value {
        let mut claims = json!({
            "sub": self.sub,
            "aud": self.aud,
            "exp": self.exp,
            "iat": self.iat,
        });
        if let Some(iss) = self.iss {
            claims["iss"] = json!(iss);
        }
        if let Some(permissions) = self.permissions {
            claims["permissions"] = json!(permissions);
        }
        claims
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_omit_permissions() {
        let claims = TestTokenBuilder::default().build();
        assert_eq!(claims["sub"], "auth0|test-user");
        assert_eq!(claims["aud"], TEST_AUDIENCE);
        assert!(claims.get("permissions").is_none());
        assert!(claims.get("iss").is_none());
    }

    #[test]
    fn test_builder_sets_permissions() {
        let claims = TestTokenBuilder::new()
            .for_user("auth0|alice")
            .with_permissions(&["read:actor", "read:movie"])
            .build();
        assert_eq!(claims["sub"], "auth0|alice");
        assert_eq!(claims["permissions"][1], "read:movie");
    }

    #[test]
    fn test_expires_in_past() {
        let claims = TestTokenBuilder::new().expires_in(-3600).build();
        assert!(claims["exp"].as_i64().unwrap() < Utc::now().timestamp());
    }
}

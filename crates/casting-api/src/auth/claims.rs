//! Decoded access token claims.
//!
//! `sub` identifies an end user at the identity provider and is redacted in
//! Debug output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Claims carried by a verified access token.
///
/// `aud` is checked during verification and not kept here.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (identity provider user id). Redacted in Debug output.
    pub sub: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Space-separated OAuth scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// RBAC permissions granted to the caller, e.g. `read:actor`.
    ///
    /// `None` when the API does not add permissions to its access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("iss", &self.iss)
            .field("scope", &self.scope)
            .field("permissions", &self.permissions)
            .finish()
    }
}

impl Claims {
    /// Whether the permissions list contains `permission` exactly.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_deref()
            .is_some_and(|granted| granted.iter().any(|p| p == permission))
    }

    /// Granted permissions, empty when the claim is absent.
    pub fn permissions(&self) -> &[String] {
        self.permissions.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn claims_with(permissions: Option<Vec<&str>>) -> Claims {
        Claims {
            sub: "auth0|5f1e0c8a".to_string(),
            exp: 1_900_000_000,
            iat: Some(1_899_990_000),
            iss: None,
            scope: None,
            permissions: permissions.map(|p| p.into_iter().map(String::from).collect()),
        }
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let debug_str = format!("{:?}", claims_with(None));

        assert!(!debug_str.contains("auth0|5f1e0c8a"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_has_permission_exact_match() {
        let claims = claims_with(Some(vec!["read:actor", "create:actor"]));

        assert!(claims.has_permission("read:actor"));
        assert!(claims.has_permission("create:actor"));
        assert!(!claims.has_permission("read:actors"));
        assert!(!claims.has_permission("read"));
    }

    #[test]
    fn test_has_permission_without_claim() {
        let claims = claims_with(None);
        assert!(!claims.has_permission("read:actor"));
        assert!(claims.permissions().is_empty());
    }

    #[test]
    fn test_deserialize_auth0_payload() {
        let json = r#"{
            "iss": "https://casting.eu.auth0.com/",
            "sub": "auth0|5f1e0c8a",
            "aud": ["casting", "https://casting.eu.auth0.com/userinfo"],
            "iat": 1700000000,
            "exp": 1700086400,
            "azp": "client",
            "scope": "openid profile",
            "permissions": ["read:movie", "read:actor"]
        }"#;

        let claims: Claims = serde_json::from_str(json).unwrap();

        assert_eq!(claims.sub, "auth0|5f1e0c8a");
        assert_eq!(claims.iat, Some(1_700_000_000));
        assert_eq!(claims.scope.as_deref(), Some("openid profile"));
        assert_eq!(claims.permissions(), ["read:movie", "read:actor"]);
    }

    #[test]
    fn test_deserialize_minimal_payload() {
        let claims: Claims = serde_json::from_str(r#"{"sub":"u","exp":1}"#).unwrap();

        assert_eq!(claims.iat, None);
        assert_eq!(claims.permissions, None);
    }
}

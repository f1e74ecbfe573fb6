//! Mock identity provider JWKS endpoint.

use crate::crypto_fixtures::TestKeypair;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock serves the key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// JWKS document containing the public halves of `keys`.
pub fn jwks_body(keys: &[&TestKeypair]) -> serde_json::Value {
    serde_json::json!({
        "keys": keys.iter().map(|k| k.jwk_json()).collect::<Vec<_>>()
    })
}

/// Full JWKS URL on `server`.
pub fn jwks_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), JWKS_PATH)
}

/// Serve `keys` on [`JWKS_PATH`] for any number of requests.
pub async fn mount_jwks(server: &MockServer, keys: &[&TestKeypair]) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(keys)))
        .mount(server)
        .await;
}

/// Serve `keys` and fail verification on drop unless fetched exactly
/// `times` times.
pub async fn mount_jwks_expecting(server: &MockServer, keys: &[&TestKeypair], times: u64) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(keys)))
        .expect(times)
        .mount(server)
        .await;
}

/// Answer every JWKS request with `status`.
pub async fn mount_jwks_failure(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

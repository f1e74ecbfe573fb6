//! Test server harness for E2E testing
//!
//! Provides `TestCastingServer`: the real router on a random port, backed by
//! a test database and a mock JWKS endpoint serving the harness's own key.

use crate::crypto_fixtures::TestKeypair;
use crate::jwks_mock::{jwks_url, mount_jwks};
use crate::token_builders::{TestTokenBuilder, TEST_AUDIENCE};
use casting_api::config::Config;
use casting_api::observability::metrics::init_metrics_recorder;
use casting_api::routes::{self, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sqlx::PgPool;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use wiremock::MockServer;

/// Key id the harness signs with.
pub const TEST_KID: &str = "test-key-01";

/// Only one global recorder can be installed per process; later servers
/// share the first handle.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the Casting API in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[sqlx::test(migrations = "../../migrations")]
/// async fn test_list_actors(pool: PgPool) -> Result<()> {
///     let server = TestCastingServer::spawn(pool).await?;
///     let response = reqwest::Client::new()
///         .get(format!("{}/api/v1/actors", server.url()))
///         .bearer_auth(server.token(&["read:actor"]))
///         .send()
///         .await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestCastingServer {
    addr: SocketAddr,
    pool: PgPool,
    config: Config,
    keypair: TestKeypair,
    _jwks_server: MockServer,
    _handle: JoinHandle<()>,
}

impl TestCastingServer {
    /// Spawn a server on 127.0.0.1 with an RS256 key served from a mock JWKS.
    pub async fn spawn(pool: PgPool) -> Result<Self, anyhow::Error> {
        let jwks_server = MockServer::start().await;
        let keypair = TestKeypair::rsa(TEST_KID)?;
        mount_jwks(&jwks_server, &[&keypair]).await;

        let vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("AUTH0_DOMAIN".to_string(), "casting-test.example.com".to_string()),
            ("AUTH0_API_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            ("JWT_ALGORITHMS".to_string(), "RS256".to_string()),
            ("JWKS_URL".to_string(), jwks_url(&jwks_server)),
            ("CASTING_DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState {
            pool: pool.clone(),
            config: config.clone(),
        });

        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            pool,
            config,
            keypair,
            _jwks_server: jwks_server,
            _handle: handle,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The key whose JWK the mock endpoint serves.
    pub fn keypair(&self) -> &TestKeypair {
        &self.keypair
    }

    /// Signed token for the default test subject with `permissions`.
    pub fn token(&self, permissions: &[&str]) -> String {
        self.token_for("auth0|test-user", permissions)
    }

    /// Signed token for `subject` with `permissions`.
    pub fn token_for(&self, subject: &str, permissions: &[&str]) -> String {
        let claims = TestTokenBuilder::new()
            .for_user(subject)
            .with_permissions(permissions)
            .build();
        self.keypair
            .sign(&claims)
            .expect("Failed to sign test token")
    }
}

impl Drop for TestCastingServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_server_spawns_successfully(pool: PgPool) -> Result<(), anyhow::Error> {
        let server = TestCastingServer::spawn(pool).await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_multiple_servers_different_ports(pool: PgPool) -> Result<(), anyhow::Error> {
        let server1 = TestCastingServer::spawn(pool.clone()).await?;
        let server2 = TestCastingServer::spawn(pool).await?;

        assert_ne!(server1.addr(), server2.addr());

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_server_config_points_at_mock_jwks(pool: PgPool) -> Result<(), anyhow::Error> {
        let server = TestCastingServer::spawn(pool).await?;

        assert!(server.config().jwks_url.ends_with("/.well-known/jwks.json"));
        assert_eq!(server.config().api_audience, TEST_AUDIENCE);

        Ok(())
    }
}

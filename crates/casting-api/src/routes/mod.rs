//! HTTP routes for the Casting API.
//!
//! Defines the Axum router and application state.

use crate::auth::permissions::{
    CREATE_ACTOR, CREATE_MOVIE, DELETE_ACTOR, DELETE_MOVIE, DELETE_USER, READ_ACTOR, READ_MOVIE,
    READ_USER, UPDATE_ACTOR, UPDATE_MOVIE, UPDATE_USER,
};
use crate::auth::{JwksClient, JwtValidator};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_permission, AuthGate};
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,

    /// Service configuration.
    pub config: Config,
}

/// Build the auth gate from configuration: one key cache and one validator,
/// shared by every protected route.
pub fn auth_gate(config: &Config) -> AuthGate {
    let jwks_client = Arc::new(JwksClient::new(
        config.jwks_url.clone(),
        Duration::from_secs(config.jwks_cache_ttl_seconds),
        Duration::from_secs(config.jwks_min_refresh_interval_seconds),
    ));
    let jwt_validator = JwtValidator::new(
        jwks_client,
        config.api_audience.clone(),
        config.jwt_algorithms.clone(),
        config.jwt_clock_skew_seconds,
    )
    .with_issuer(config.issuer.clone());

    AuthGate::authenticated(Arc::new(jwt_validator))
}

/// Build the application routes.
///
/// - `/health`, `/ready`, `/metrics`: public, unversioned
/// - `/api/v1/actors[/:id]`, `/api/v1/movies[/:id]`, `/api/v1/users[/:id]`:
///   each method gated by its own permission
/// - `/api/v1/me`: any valid token
///
/// Wrapped in [`service_layers`].
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let gate = auth_gate(&state.config);

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let api_routes = api_routes(&gate).with_state(state);

    service_layers(public_routes.merge(metrics_routes).merge(api_routes))
}

/// Layers: trace, 30 second timeout, panic-to-500, and HTTP metrics outermost.
pub fn service_layers(router: Router) -> Router {
    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CatchPanicLayer::new())
        // Outermost so framework responses (404, 405, timeouts) are counted too.
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// Versioned API routes. Every method router carries its own gate, so a
/// path can require different permissions per method.
pub fn api_routes(gate: &AuthGate) -> Router<Arc<AppState>> {
    let guard = |permission: &'static str| {
        middleware::from_fn_with_state(gate.requiring(permission), require_permission)
    };

    Router::new()
        .route(
            "/api/v1/actors",
            post(handlers::create_actor)
                .route_layer(guard(CREATE_ACTOR))
                .merge(get(handlers::list_actors).route_layer(guard(READ_ACTOR))),
        )
        .route(
            "/api/v1/actors/:id",
            get(handlers::get_actor)
                .route_layer(guard(READ_ACTOR))
                .merge(patch(handlers::update_actor).route_layer(guard(UPDATE_ACTOR)))
                .merge(delete(handlers::delete_actor).route_layer(guard(DELETE_ACTOR))),
        )
        .route(
            "/api/v1/movies",
            post(handlers::create_movie)
                .route_layer(guard(CREATE_MOVIE))
                .merge(get(handlers::list_movies).route_layer(guard(READ_MOVIE))),
        )
        .route(
            "/api/v1/movies/:id",
            get(handlers::get_movie)
                .route_layer(guard(READ_MOVIE))
                .merge(patch(handlers::update_movie).route_layer(guard(UPDATE_MOVIE)))
                .merge(delete(handlers::delete_movie).route_layer(guard(DELETE_MOVIE))),
        )
        .route(
            "/api/v1/users",
            get(handlers::list_users).route_layer(guard(READ_USER)),
        )
        .route(
            "/api/v1/users/:id",
            get(handlers::get_user)
                .route_layer(guard(READ_USER))
                .merge(patch(handlers::update_user).route_layer(guard(UPDATE_USER)))
                .merge(delete(handlers::delete_user).route_layer(guard(DELETE_USER))),
        )
        .route(
            "/api/v1/me",
            get(handlers::get_me).route_layer(middleware::from_fn_with_state(
                gate.clone(),
                require_permission,
            )),
        )
}

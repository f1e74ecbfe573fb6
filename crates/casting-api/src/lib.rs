//! Casting API Service Library
//!
//! REST API for a casting agency: movies, actors, and the users who log in
//! through an external OAuth2/OIDC identity provider.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> handlers/*.rs -> repositories/*.rs
//! ```
//!
//! Every `/api/v1` route sits behind an auth gate that verifies an RS/ES/EdDSA
//! signed bearer token against the provider's JWKS and checks the permission
//! the route requires.
//!
//! # Modules
//!
//! - `auth` - JWKS key cache, token verification, permission checks
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Auth gate and HTTP metrics
//! - `models` - Request, response and row types
//! - `observability` - Prometheus metrics
//! - `repositories` - PostgreSQL access
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;

//! HTTP middleware.
//!
//! - `auth` - auth gate for protected routes
//! - `http_metrics` - request metrics for every response

pub mod auth;
pub mod http_metrics;

pub use auth::{extract_bearer_token, require_permission, AuthGate};
pub use http_metrics::http_metrics_middleware;

//! Prometheus metrics for the Casting API.
//!
//! Naming: `casting_` prefix, `_total` for counters, `_seconds` for duration
//! histograms. Labels are bounded:
//! - `method`: HTTP verbs
//! - `endpoint`: route templates (`/api/v1/actors/{id}`), unknown paths fold
//!   into `/other`
//! - `status`: success, error, timeout
//! - `operation`: repository operation names fixed in code
//! - `reason`: `ApiError::code()` values

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Resource collections served under `/api/v1`.
const COLLECTIONS: [&str; 3] = ["actors", "movies", "users"];

/// Install the global Prometheus recorder and return its render handle.
///
/// # Errors
///
/// Returns an error if a recorder is already installed or bucket
/// configuration is rejected.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("casting_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("casting_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("casting_jwks_refresh".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set JWKS refresh buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record HTTP request completion.
///
/// Metric: `casting_http_requests_total`, `casting_http_request_duration_seconds`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("casting_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("casting_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Record a JWKS fetch.
///
/// Metric: `casting_jwks_refresh_total`, `casting_jwks_refresh_duration_seconds`
pub fn record_jwks_refresh(status: &str, duration: Duration) {
    histogram!("casting_jwks_refresh_duration_seconds").record(duration.as_secs_f64());

    counter!("casting_jwks_refresh_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a request turned away by the auth gate.
///
/// Metric: `casting_auth_rejections_total`
pub fn record_auth_rejection(reason: &'static str) {
    counter!("casting_auth_rejections_total",
        "reason" => reason
    )
    .increment(1);
}

/// Record database query execution.
///
/// Metric: `casting_db_query_duration_seconds`, `casting_db_queries_total`
pub fn record_db_query(operation: &'static str, status: &'static str, duration: Duration) {
    histogram!("casting_db_query_duration_seconds",
        "operation" => operation
    )
    .record(duration.as_secs_f64());

    counter!("casting_db_queries_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path to its route template.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/ready" | "/metrics" | "/api/v1/me" => return path.to_string(),
        _ => {}
    }

    let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();
    match segments.as_slice() {
        ["", "api", "v1", collection] if COLLECTIONS.contains(collection) => {
            format!("/api/v1/{collection}")
        }
        ["", "api", "v1", collection, id]
            if COLLECTIONS.contains(collection) && id.parse::<i64>().is_ok() =>
        {
            format!("/api/v1/{collection}/{{id}}")
        }
        _ => "/other".to_string(),
    }
}

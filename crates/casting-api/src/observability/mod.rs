//! Observability: Prometheus metrics definitions.

pub mod metrics;

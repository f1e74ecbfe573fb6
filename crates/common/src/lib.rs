//! Utilities shared across the casting services.

#![warn(clippy::pedantic)]

/// Token inspection helpers (size limit, header parsing, iat checks)
pub mod jwt;

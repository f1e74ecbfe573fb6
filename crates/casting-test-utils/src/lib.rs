//! # Casting Test Utilities
//!
//! Shared test utilities for the Casting API.
//!
//! This crate provides:
//! - Deterministic signing keys with matching JWKs
//! - A claims builder in the identity provider's token shape
//! - Mock JWKS endpoint helpers (wiremock)
//! - Server test harness (`TestCastingServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use casting_test_utils::*;
//!
//! let key = TestKeypair::rsa("kid-1")?;
//! let token = key.sign(
//!     &TestTokenBuilder::new().with_permissions(&["read:movie"]).build(),
//! )?;
//! ```

pub mod crypto_fixtures;
pub mod jwks_mock;
pub mod server_harness;
pub mod token_builders;

pub use crypto_fixtures::*;
pub use jwks_mock::*;
pub use server_harness::*;
pub use token_builders::*;

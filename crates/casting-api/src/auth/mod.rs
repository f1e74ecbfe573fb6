//! Authentication and authorization.
//!
//! - `jwks` - cached key set from the identity provider
//! - `jwt` - token verification
//! - `claims` - decoded token payload
//! - `permissions` - permission names and the permission check

pub mod claims;
pub mod jwks;
pub mod jwt;
pub mod permissions;

pub use claims::Claims;
pub use jwks::JwksClient;
pub use jwt::JwtValidator;
pub use permissions::check_permission;

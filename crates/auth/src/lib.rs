//! `assetdesk-auth`: authentication and authorization.
//!
//! No HTTP or storage here: the crate issues and validates identity tokens and
//! decides role/self-ownership policy. The API layer supplies the user records
//! the decisions are made over.

pub mod authorize;
pub mod claims;
pub mod principal;
pub mod roles;
pub mod token;

pub use authorize::{AuthzError, authorize, ensure_self};
pub use claims::{IdentityClaims, TOKEN_TTL, TokenValidationError, validate_claims};
pub use principal::Principal;
pub use roles::{Role, UnknownRole};
pub use token::{Hs256Jwt, IssuedToken, JwtValidator, TokenError};

//! Authentication and role checks
//!
//! Access tokens are HS256 JWTs issued by `POST /api/auth/login`. Every
//! protected handler takes a [`crate::middleware::CurrentUser`] and then
//! checks the role allowlist for its operation with [`require_roles`].

pub mod password;
pub mod roles;
pub mod tokens;

pub use password::verify_password;
pub use roles::{require_roles, Role};
pub use tokens::{parse_expires_in, Claims, IssuedToken, JwtKeys};

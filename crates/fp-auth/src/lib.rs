//! Credentials and sessions.
//!
//! Passwords are bcrypt hashes. Sessions are HS256 JWTs carrying the user
//! id and role; the HTTP layer reads them from `Authorization: Bearer`.

pub mod password;
pub mod session;
pub mod validate;

pub use password::{hash_password, verify_password, DEFAULT_COST};
pub use session::{AuthError, SessionClaims, SessionKeys};
pub use validate::{normalize_email, validate_email, validate_name, validate_password};

//! Token issuing, password hashing and the request-side identity checks.

mod extractor;
mod jwt;
mod password;

pub use extractor::{bearer_token, AuthUser};
pub use jwt::{Claims, JwtKeys};
pub use password::{hash_password, verify_password};

/// Name of the session cookie carrying the token
pub const TOKEN_COOKIE: &str = "token";

pub mod gatekeeper;
pub mod rate_limit;
pub mod request_logger;

pub use gatekeeper::{Gatekeeper, HttpTokenVerifier, LocalTokenVerifier, SharedVerifier, TokenCache};
pub use rate_limit::{FixedWindowLimiter, RateLimiter};
pub use request_logger::RequestLogger;

//! Middleware for the Lendflow API
//!
//! Request tracing, rate limiting, response headers and the authenticated
//! session extractor.

pub mod auth;
mod rate_limiter;
mod logging;

pub use auth::AuthenticatedUser;
pub use rate_limiter::{rate_limit, RateLimiter};
pub use logging::{request_tracing, security_headers};

//! Authentication module
//!
//! - Email/password login for staff users
//! - JWT access and refresh tokens
//! - Session tracking so tokens can be revoked

mod jwt;
mod service;

pub use jwt::{generate_access_token, generate_refresh_token, verify_token, Claims, JwtError, TokenType};
pub use service::{hash_password, AuthError, AuthService};

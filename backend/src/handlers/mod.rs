//! API handlers for the Lendflow backend

pub mod analytics;
pub mod auth;
pub mod client;
pub mod group;
pub mod loan;
pub mod user;

pub use crate::middleware::auth::AuthenticatedUser;

//! Back-office services outside the loan workflow

mod analytics;
mod user;

pub use analytics::{AnalyticsService, PortfolioSummary, StatusSummary};
pub use user::UserService;

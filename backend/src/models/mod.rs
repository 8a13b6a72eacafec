//! Shared data models for the Lendflow backend

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod auth;
pub use auth::*;

/// Staff user model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub branch: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            branch: user.branch,
            active: user.active,
            created_at: user.created_at,
        }
    }
}

/// Staff roles. The role is only ever used as input to
/// [`crate::workflow::Policy`]; it carries no other structure.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    InitiatorAdmin,
    ApproverAdmin,
    LoanOfficer,
}

impl UserRole {
    pub const ALL: [UserRole; 4] = [
        UserRole::SuperAdmin,
        UserRole::InitiatorAdmin,
        UserRole::ApproverAdmin,
        UserRole::LoanOfficer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::InitiatorAdmin => "initiator_admin",
            UserRole::ApproverAdmin => "approver_admin",
            UserRole::LoanOfficer => "loan_officer",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// Pagination parameters
#[derive(Debug, Deserialize, Default, Clone, Copy)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationParams {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    /// Normalised (page, limit, offset)
    pub fn resolve(&self) -> (i64, i64, i64) {
        let limit = self
            .limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        // Keeps (page - 1) * limit inside i64
        let page = self.page.unwrap_or(1).clamp(1, i64::MAX / Self::MAX_LIMIT);
        (page, limit, (page - 1) * limit)
    }
}

/// Paginated response
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!("admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_serde_matches_as_str() {
        let json = serde_json::to_string(&UserRole::ApproverAdmin).unwrap();
        assert_eq!(json, "\"approver_admin\"");
    }

    #[test]
    fn test_pagination_defaults_and_clamps() {
        assert_eq!(PaginationParams::default().resolve(), (1, 20, 0));

        let params = PaginationParams {
            page: Some(3),
            limit: Some(500),
        };
        assert_eq!(params.resolve(), (3, 100, 200));

        let params = PaginationParams {
            page: Some(-2),
            limit: Some(0),
        };
        assert_eq!(params.resolve(), (1, 1, 0));
    }

    #[test]
    fn test_pagination_huge_page_does_not_overflow() {
        let params = PaginationParams {
            page: Some(i64::MAX),
            limit: Some(100),
        };
        let (page, limit, offset) = params.resolve();
        assert_eq!(page, i64::MAX / PaginationParams::MAX_LIMIT);
        assert_eq!(limit, 100);
        assert!(offset >= 0);
        assert_eq!(offset, (page - 1) * limit);
    }
}

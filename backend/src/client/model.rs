use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::models::PaginationParams;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Client {
    pub id: Uuid,
    pub full_name: String,
    pub national_id: String,
    pub phone: Option<String>,
    pub branch: Option<String>,
    pub savings_balance: i64,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 120, message = "full_name is required"))]
    pub full_name: String,
    #[validate(length(min = 1, max = 40, message = "national_id is required"))]
    pub national_id: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ClientQuery {
    /// Matches name or national ID
    pub q: Option<String>,
    pub branch: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ClientQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::scoring::FiveCScores;
use crate::workflow::WorkflowError;

/// Stored credit assessment
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct CreditAssessment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub officer_id: Uuid,
    pub assessed_by: Uuid,
    pub character_score: i32,
    pub capacity_score: i32,
    pub capital_score: i32,
    pub collateral_score: i32,
    pub conditions_score: i32,
    pub total_score: i32,
    pub below_threshold_override: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAssessmentRequest {
    pub loan_id: Uuid,
    /// Loan officer responsible for the client; defaults to the assessor
    pub officer_id: Option<Uuid>,
    pub character: i32,
    pub capacity: i32,
    pub capital: i32,
    pub collateral: i32,
    pub conditions: i32,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub confirm_low_score: bool,
}

impl CreateAssessmentRequest {
    pub fn scores(&self) -> Result<FiveCScores, WorkflowError> {
        FiveCScores::new(
            self.character,
            self.capacity,
            self.capital,
            self.collateral,
            self.conditions,
        )
    }
}

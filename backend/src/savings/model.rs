use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::workflow::WorkflowError;

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "savings_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SavingsKind {
    Deposit,
    Withdrawal,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct SavingsTransaction {
    pub id: Uuid,
    pub client_id: Uuid,
    /// Signed: deposits positive, withdrawals negative
    pub amount: i64,
    pub kind: SavingsKind,
    pub balance_after: i64,
    pub recorded_by: Uuid,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Add-only deposit for `POST /api/clients/:id/savings`
#[derive(Debug, Deserialize, Validate)]
pub struct DepositRequest {
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: i64,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// Signed adjustment for `POST /api/savings`
#[derive(Debug, Deserialize, Validate)]
pub struct AdjustSavingsRequest {
    pub client_id: Uuid,
    pub amount: i64,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// Balance after applying a signed amount; never below zero
pub fn apply_to_balance(balance: i64, amount: i64) -> Result<(i64, SavingsKind), WorkflowError> {
    if amount == 0 {
        return Err(WorkflowError::Invalid("Amount must not be zero".to_string()));
    }

    let next = balance
        .checked_add(amount)
        .ok_or_else(|| WorkflowError::Invalid("Amount is out of range".to_string()))?;
    if next < 0 {
        return Err(WorkflowError::Invalid(format!(
            "Cannot deduct {} from a savings balance of {}",
            -amount, balance
        )));
    }

    let kind = if amount > 0 {
        SavingsKind::Deposit
    } else {
        SavingsKind::Withdrawal
    };
    Ok((next, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_and_withdrawal() {
        assert_eq!(apply_to_balance(100, 50).unwrap(), (150, SavingsKind::Deposit));
        assert_eq!(apply_to_balance(100, -100).unwrap(), (0, SavingsKind::Withdrawal));
    }

    #[test]
    fn test_overdraw_refused() {
        let err = apply_to_balance(100, -101).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot deduct 101 from a savings balance of 100"
        );
    }

    #[test]
    fn test_zero_refused() {
        assert!(apply_to_balance(100, 0).is_err());
    }
}

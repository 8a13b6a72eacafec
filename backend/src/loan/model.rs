use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::fees::FeeBreakdown;
use crate::assessment::CreditAssessment;
use crate::guarantor::{Guarantor, GuarantorInput};
use crate::models::PaginationParams;
use crate::workflow::{LoanAction, LoanStatus, WorkflowError};

/// Who the loan is issued to
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "loan_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanType {
    Individual,
    Group,
}

/// Loan model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Loan {
    pub id: Uuid,
    pub loan_type: LoanType,
    pub client_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub product: String,
    /// Minor currency units
    pub principal: i64,
    /// Flat interest over the term, in basis points of principal
    pub interest_rate_bps: i64,
    pub term_months: i32,
    pub status: LoanStatus,
    pub outstanding_balance: i64,
    pub initiated_by: Uuid,
    pub disbursed_by: Option<Uuid>,
    pub disbursement_reference: Option<String>,
    pub disbursed_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// Client or group receiving the funds
    pub fn recipient(&self) -> Option<Uuid> {
        match self.loan_type {
            LoanType::Individual => self.client_id,
            LoanType::Group => self.group_id,
        }
    }
}

/// Request body for `POST /api/loans/initiate`
#[derive(Debug, Deserialize, Validate)]
pub struct InitiateLoanRequest {
    pub loan_type: LoanType,
    pub client_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100, message = "product is required"))]
    pub product: String,
    pub amount: i64,
    pub term_months: i32,
    pub interest_rate_bps: Option<i64>,
    #[serde(default)]
    #[validate]
    pub guarantors: Vec<GuarantorInput>,
}

impl InitiateLoanRequest {
    pub const MAX_TERM_MONTHS: i32 = 120;

    /// Structural checks that need no database access
    pub fn check(&self, min_individual_guarantors: usize) -> Result<(), WorkflowError> {
        if self.amount <= 0 {
            return Err(WorkflowError::Invalid(
                "Loan amount must be positive".to_string(),
            ));
        }
        if !(1..=Self::MAX_TERM_MONTHS).contains(&self.term_months) {
            return Err(WorkflowError::Invalid(format!(
                "Term must be between 1 and {} months",
                Self::MAX_TERM_MONTHS
            )));
        }
        if let Some(rate) = self.interest_rate_bps {
            if !(0..=10_000).contains(&rate) {
                return Err(WorkflowError::Invalid(
                    "Interest rate must be between 0 and 10000 basis points".to_string(),
                ));
            }
        }

        match (self.loan_type, self.client_id, self.group_id) {
            (LoanType::Individual, Some(_), None) => {
                let identified = self.identified_guarantors().count();
                if identified < min_individual_guarantors {
                    return Err(WorkflowError::Invalid(format!(
                        "At least {} guarantors with name and national ID are required for an individual loan",
                        min_individual_guarantors
                    )));
                }
                Ok(())
            }
            (LoanType::Group, None, Some(_)) => Ok(()),
            (LoanType::Individual, _, _) => Err(WorkflowError::Invalid(
                "An individual loan needs a client and no group".to_string(),
            )),
            (LoanType::Group, _, _) => Err(WorkflowError::Invalid(
                "A group loan needs a group and no client".to_string(),
            )),
        }
    }

    /// Guarantor rows that will be stored; blank rows are dropped
    pub fn identified_guarantors(&self) -> impl Iterator<Item = &GuarantorInput> {
        self.guarantors.iter().filter(|g| g.is_identified())
    }
}

/// Initiation result
#[derive(Debug, Serialize)]
pub struct InitiatedLoan {
    #[serde(flatten)]
    pub loan: LoanDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees: Option<FeeBreakdown>,
}

/// Loan with everything a reviewer needs and the actions open to the caller
#[derive(Debug, Serialize)]
pub struct LoanDetail {
    #[serde(flatten)]
    pub loan: Loan,
    pub approved_by: Vec<Uuid>,
    pub accepted_guarantors: i64,
    pub latest_score: Option<i32>,
    pub guarantors: Vec<Guarantor>,
    pub assessments: Vec<CreditAssessment>,
    pub allowed_actions: Vec<LoanAction>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoanFilter {
    pub status: Option<LoanStatus>,
    pub loan_type: Option<LoanType>,
    pub product: Option<String>,
    pub client_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl LoanFilter {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Aggregates over the filtered loan set
#[derive(Debug, Serialize, Default)]
pub struct LoanStats {
    pub by_status: HashMap<LoanStatus, i64>,
    pub total_principal: i64,
    pub total_outstanding: i64,
}

#[derive(Debug, Serialize)]
pub struct LoanListResponse {
    pub data: Vec<Loan>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub stats: LoanStats,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Repayment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub amount: i64,
    pub balance_after: i64,
    pub recorded_by: Uuid,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RepaymentRequest {
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: i64,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// Optional reason given when rejecting, cancelling or defaulting
#[derive(Debug, Deserialize, Default, Validate)]
pub struct TransitionRequest {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

/// Repayment result: the ledger row and the loan after it was applied
#[derive(Debug, Serialize)]
pub struct RepaymentReceipt {
    pub repayment: Repayment,
    pub loan: Loan,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guarantor(name: &str, national_id: &str) -> GuarantorInput {
        GuarantorInput {
            name: name.to_string(),
            national_id: national_id.to_string(),
            ..Default::default()
        }
    }

    fn individual(guarantors: Vec<GuarantorInput>) -> InitiateLoanRequest {
        InitiateLoanRequest {
            loan_type: LoanType::Individual,
            client_id: Some(Uuid::new_v4()),
            group_id: None,
            product: "business".to_string(),
            amount: 100_000,
            term_months: 12,
            interest_rate_bps: Some(1_500),
            guarantors,
        }
    }

    #[test]
    fn test_individual_needs_three_identified_guarantors() {
        let two = individual(vec![guarantor("A", "1"), guarantor("B", "2")]);
        assert!(two.check(3).is_err());

        let blank_third = individual(vec![
            guarantor("A", "1"),
            guarantor("B", "2"),
            guarantor("C", ""),
        ]);
        assert!(blank_third.check(3).is_err());

        let three = individual(vec![
            guarantor("A", "1"),
            guarantor("B", "2"),
            guarantor("C", "3"),
        ]);
        assert!(three.check(3).is_ok());
    }

    #[test]
    fn test_group_loan_needs_no_guarantors() {
        let req = InitiateLoanRequest {
            loan_type: LoanType::Group,
            client_id: None,
            group_id: Some(Uuid::new_v4()),
            guarantors: Vec::new(),
            ..individual(Vec::new())
        };
        assert!(req.check(3).is_ok());
    }

    #[test]
    fn test_borrower_must_match_loan_type() {
        let mut req = individual(vec![
            guarantor("A", "1"),
            guarantor("B", "2"),
            guarantor("C", "3"),
        ]);
        req.group_id = Some(Uuid::new_v4());
        assert!(req.check(3).is_err());

        req.group_id = None;
        req.client_id = None;
        assert!(req.check(3).is_err());
    }

    #[test]
    fn test_amount_and_term_validated() {
        let ok = || {
            individual(vec![
                guarantor("A", "1"),
                guarantor("B", "2"),
                guarantor("C", "3"),
            ])
        };

        let mut req = ok();
        req.amount = 0;
        assert!(req.check(3).is_err());

        let mut req = ok();
        req.term_months = 0;
        assert!(req.check(3).is_err());

        let mut req = ok();
        req.interest_rate_bps = Some(-1);
        assert!(req.check(3).is_err());
    }

    #[test]
    fn test_stats_serialize_status_keys() {
        let mut stats = LoanStats::default();
        stats.by_status.insert(LoanStatus::Approved, 2);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["by_status"]["approved"], 2);
    }
}

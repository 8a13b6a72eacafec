//! Loan status state machine
//!
//! Every status change a loan can go through is listed in [`TRANSITIONS`].
//! Anything not in the table is an illegal jump and is refused with
//! [`WorkflowError::IllegalTransition`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::WorkflowError;

/// Loan status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "loan_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Initiated,
    Approved,
    Disbursed,
    Repaid,
    Defaulted,
    Cancelled,
    Rejected,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 7] = [
        LoanStatus::Initiated,
        LoanStatus::Approved,
        LoanStatus::Disbursed,
        LoanStatus::Repaid,
        LoanStatus::Defaulted,
        LoanStatus::Cancelled,
        LoanStatus::Rejected,
    ];

    /// Status a freshly initiated loan starts in
    pub fn initial() -> Self {
        LoanStatus::Initiated
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Initiated => "initiated",
            LoanStatus::Approved => "approved",
            LoanStatus::Disbursed => "disbursed",
            LoanStatus::Repaid => "repaid",
            LoanStatus::Defaulted => "defaulted",
            LoanStatus::Cancelled => "cancelled",
            LoanStatus::Rejected => "rejected",
        }
    }

    /// Terminal statuses have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        !TRANSITIONS.iter().any(|(from, _, _)| from == self)
    }

    /// Guarantors may still be added or decided while the loan is pending
    pub fn accepts_guarantor_changes(&self) -> bool {
        matches!(self, LoanStatus::Initiated | LoanStatus::Approved)
    }

    /// Resolve the status reached by applying `action` from this status
    pub fn transition(self, action: LoanAction) -> Result<LoanStatus, WorkflowError> {
        TRANSITIONS
            .iter()
            .find(|(from, act, _)| *from == self && *act == action)
            .map(|(_, _, to)| *to)
            .ok_or(WorkflowError::IllegalTransition { from: self, action })
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow actions performed against an existing loan
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LoanAction {
    Assess,
    Approve,
    Reject,
    Disburse,
    RecordRepayment,
    Cancel,
    MarkDefaulted,
    /// Applied by the repayment ledger when the outstanding balance reaches
    /// zero. Never requested directly.
    Settle,
}

impl LoanAction {
    /// Actions a staff user can request, in display order
    pub const REQUESTABLE: [LoanAction; 7] = [
        LoanAction::Assess,
        LoanAction::Approve,
        LoanAction::Reject,
        LoanAction::Disburse,
        LoanAction::RecordRepayment,
        LoanAction::Cancel,
        LoanAction::MarkDefaulted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanAction::Assess => "assess",
            LoanAction::Approve => "approve",
            LoanAction::Reject => "reject",
            LoanAction::Disburse => "disburse",
            LoanAction::RecordRepayment => "record_repayment",
            LoanAction::Cancel => "cancel",
            LoanAction::MarkDefaulted => "mark_defaulted",
            LoanAction::Settle => "settle",
        }
    }

    /// Checker actions may never be performed by the loan's initiator
    pub fn requires_checker(&self) -> bool {
        matches!(
            self,
            LoanAction::Approve | LoanAction::Reject | LoanAction::Disburse | LoanAction::Cancel
        )
    }
}

impl fmt::Display for LoanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (from, action, to)
pub const TRANSITIONS: &[(LoanStatus, LoanAction, LoanStatus)] = &[
    (LoanStatus::Initiated, LoanAction::Assess, LoanStatus::Initiated),
    (LoanStatus::Initiated, LoanAction::Approve, LoanStatus::Approved),
    (LoanStatus::Initiated, LoanAction::Reject, LoanStatus::Rejected),
    (LoanStatus::Initiated, LoanAction::Cancel, LoanStatus::Cancelled),
    (LoanStatus::Approved, LoanAction::Cancel, LoanStatus::Cancelled),
    (LoanStatus::Approved, LoanAction::Disburse, LoanStatus::Disbursed),
    (LoanStatus::Disbursed, LoanAction::RecordRepayment, LoanStatus::Disbursed),
    (LoanStatus::Disbursed, LoanAction::Settle, LoanStatus::Repaid),
    (LoanStatus::Disbursed, LoanAction::MarkDefaulted, LoanStatus::Defaulted),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let status = LoanStatus::initial();
        let status = status.transition(LoanAction::Assess).unwrap();
        assert_eq!(status, LoanStatus::Initiated);
        let status = status.transition(LoanAction::Approve).unwrap();
        assert_eq!(status, LoanStatus::Approved);
        let status = status.transition(LoanAction::Disburse).unwrap();
        assert_eq!(status, LoanStatus::Disbursed);
        let status = status.transition(LoanAction::RecordRepayment).unwrap();
        assert_eq!(status, LoanStatus::Disbursed);
        let status = status.transition(LoanAction::Settle).unwrap();
        assert_eq!(status, LoanStatus::Repaid);
    }

    #[test]
    fn test_cannot_disburse_straight_from_initiated() {
        let err = LoanStatus::Initiated
            .transition(LoanAction::Disburse)
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::IllegalTransition {
                from: LoanStatus::Initiated,
                action: LoanAction::Disburse
            }
        ));
    }

    #[test]
    fn test_assessment_only_while_initiated() {
        assert!(LoanStatus::Approved.transition(LoanAction::Assess).is_err());
        assert!(LoanStatus::Disbursed.transition(LoanAction::Assess).is_err());
    }

    #[test]
    fn test_off_ramps() {
        assert_eq!(
            LoanStatus::Initiated.transition(LoanAction::Reject).unwrap(),
            LoanStatus::Rejected
        );
        assert_eq!(
            LoanStatus::Approved.transition(LoanAction::Cancel).unwrap(),
            LoanStatus::Cancelled
        );
        assert_eq!(
            LoanStatus::Disbursed
                .transition(LoanAction::MarkDefaulted)
                .unwrap(),
            LoanStatus::Defaulted
        );
        assert!(LoanStatus::Approved.transition(LoanAction::Reject).is_err());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for status in [
            LoanStatus::Repaid,
            LoanStatus::Defaulted,
            LoanStatus::Cancelled,
            LoanStatus::Rejected,
        ] {
            assert!(status.is_terminal(), "{} should be terminal", status);
            for action in LoanAction::REQUESTABLE {
                assert!(status.transition(action).is_err());
            }
        }
        assert!(!LoanStatus::Initiated.is_terminal());
        assert!(!LoanStatus::Disbursed.is_terminal());
    }

    #[test]
    fn test_status_never_moves_backwards() {
        let rank = |s: LoanStatus| match s {
            LoanStatus::Initiated => 0,
            LoanStatus::Approved => 1,
            LoanStatus::Disbursed => 2,
            _ => 3,
        };
        for (from, _, to) in TRANSITIONS {
            assert!(rank(*to) >= rank(*from), "{} -> {}", from, to);
        }
    }
}

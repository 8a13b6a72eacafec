//! Prerequisite guards for loan actions
//!
//! [`authorize`] is the single gate every loan mutation passes through: it
//! checks the role policy, the transition table, the maker-checker rule and
//! the guarantor/assessment prerequisites against a [`LoanSnapshot`].
//! [`available_actions`] runs the same gate for every requestable action so
//! clients can render exactly the buttons the server will accept.

use serde::Serialize;
use uuid::Uuid;

use super::{LoanAction, LoanStatus, Policy, WorkflowError};
use crate::config::WorkflowConfig;
use crate::models::UserRole;

/// The acting staff user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }
}

/// Everything the gate needs to know about a loan
#[derive(Debug, Clone, Serialize)]
pub struct LoanSnapshot {
    pub loan_id: Uuid,
    pub status: LoanStatus,
    pub initiated_by: Uuid,
    pub assessment_count: i64,
    pub latest_score: Option<i32>,
    pub accepted_guarantors: i64,
    pub approvals: Vec<Uuid>,
}

impl LoanSnapshot {
    pub fn has_assessment(&self) -> bool {
        self.assessment_count > 0
    }
}

/// Thresholds the gate enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateRules {
    pub min_accepted_guarantors: i64,
    pub required_approvals: usize,
}

impl Default for GateRules {
    fn default() -> Self {
        Self {
            min_accepted_guarantors: 1,
            required_approvals: 1,
        }
    }
}

impl From<&WorkflowConfig> for GateRules {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            min_accepted_guarantors: config.min_accepted_guarantors,
            required_approvals: config.required_approvals,
        }
    }
}

/// Decide whether `actor` may apply `action` to the loan, returning the
/// status the loan moves to if so.
pub fn authorize(
    snapshot: &LoanSnapshot,
    actor: &Actor,
    action: LoanAction,
    rules: &GateRules,
) -> Result<LoanStatus, WorkflowError> {
    if action == LoanAction::Settle {
        return Err(WorkflowError::NotRequestable(action));
    }

    Policy::require(actor.role, action.into())?;
    let target = snapshot.status.transition(action)?;

    if action.requires_checker() && actor.user_id == snapshot.initiated_by {
        return Err(WorkflowError::MakerChecker(action));
    }

    match action {
        LoanAction::Approve => {
            if snapshot.approvals.contains(&actor.user_id) {
                return Err(WorkflowError::AlreadyApproved);
            }
            require_prerequisites(snapshot, rules)?;

            // Further approvals are collected before the status moves on
            if snapshot.approvals.len() + 1 < rules.required_approvals {
                Ok(snapshot.status)
            } else {
                Ok(target)
            }
        }
        LoanAction::Disburse => {
            require_prerequisites(snapshot, rules)?;
            Ok(target)
        }
        _ => Ok(target),
    }
}

fn require_prerequisites(snapshot: &LoanSnapshot, rules: &GateRules) -> Result<(), WorkflowError> {
    if !snapshot.has_assessment() {
        return Err(WorkflowError::MissingAssessment);
    }
    if snapshot.accepted_guarantors < rules.min_accepted_guarantors {
        return Err(WorkflowError::InsufficientGuarantors {
            required: rules.min_accepted_guarantors,
            found: snapshot.accepted_guarantors,
        });
    }
    Ok(())
}

/// Every requestable action `actor` may perform on the loan right now
pub fn available_actions(
    snapshot: &LoanSnapshot,
    actor: &Actor,
    rules: &GateRules,
) -> Vec<LoanAction> {
    LoanAction::REQUESTABLE
        .into_iter()
        .filter(|action| authorize(snapshot, actor, *action, rules).is_ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: LoanStatus, initiator: Uuid) -> LoanSnapshot {
        LoanSnapshot {
            loan_id: Uuid::new_v4(),
            status,
            initiated_by: initiator,
            assessment_count: 1,
            latest_score: Some(20),
            accepted_guarantors: 1,
            approvals: Vec::new(),
        }
    }

    #[test]
    fn test_approver_can_approve_ready_loan() {
        let initiator = Uuid::new_v4();
        let approver = Actor::new(Uuid::new_v4(), UserRole::ApproverAdmin);
        let snap = snapshot(LoanStatus::Initiated, initiator);

        let next = authorize(&snap, &approver, LoanAction::Approve, &GateRules::default());
        assert_eq!(next.unwrap(), LoanStatus::Approved);
    }

    #[test]
    fn test_initiator_is_never_the_checker() {
        let initiator = Uuid::new_v4();
        let actor = Actor::new(initiator, UserRole::ApproverAdmin);
        let snap = snapshot(LoanStatus::Initiated, initiator);

        for action in [LoanAction::Approve, LoanAction::Reject, LoanAction::Cancel] {
            let err = authorize(&snap, &actor, action, &GateRules::default()).unwrap_err();
            assert!(matches!(err, WorkflowError::MakerChecker(a) if a == action));
        }

        let approved = snapshot(LoanStatus::Approved, initiator);
        let err = authorize(&approved, &actor, LoanAction::Disburse, &GateRules::default())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::MakerChecker(LoanAction::Disburse)));
    }

    #[test]
    fn test_approve_requires_assessment() {
        let approver = Actor::new(Uuid::new_v4(), UserRole::ApproverAdmin);
        let mut snap = snapshot(LoanStatus::Initiated, Uuid::new_v4());
        snap.assessment_count = 0;
        snap.latest_score = None;

        let err = authorize(&snap, &approver, LoanAction::Approve, &GateRules::default())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::MissingAssessment));
    }

    #[test]
    fn test_approve_requires_accepted_guarantor() {
        let approver = Actor::new(Uuid::new_v4(), UserRole::ApproverAdmin);
        let mut snap = snapshot(LoanStatus::Initiated, Uuid::new_v4());
        snap.accepted_guarantors = 0;

        let err = authorize(&snap, &approver, LoanAction::Approve, &GateRules::default())
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InsufficientGuarantors {
                required: 1,
                found: 0
            }
        ));
    }

    #[test]
    fn test_reject_needs_no_prerequisites() {
        let approver = Actor::new(Uuid::new_v4(), UserRole::ApproverAdmin);
        let mut snap = snapshot(LoanStatus::Initiated, Uuid::new_v4());
        snap.assessment_count = 0;
        snap.accepted_guarantors = 0;

        let next = authorize(&snap, &approver, LoanAction::Reject, &GateRules::default());
        assert_eq!(next.unwrap(), LoanStatus::Rejected);
    }

    #[test]
    fn test_multi_approval_collects_distinct_approvers() {
        let rules = GateRules {
            min_accepted_guarantors: 1,
            required_approvals: 2,
        };
        let first = Actor::new(Uuid::new_v4(), UserRole::ApproverAdmin);
        let second = Actor::new(Uuid::new_v4(), UserRole::ApproverAdmin);
        let mut snap = snapshot(LoanStatus::Initiated, Uuid::new_v4());

        assert_eq!(
            authorize(&snap, &first, LoanAction::Approve, &rules).unwrap(),
            LoanStatus::Initiated
        );
        snap.approvals.push(first.user_id);

        let err = authorize(&snap, &first, LoanAction::Approve, &rules).unwrap_err();
        assert!(matches!(err, WorkflowError::AlreadyApproved));

        assert_eq!(
            authorize(&snap, &second, LoanAction::Approve, &rules).unwrap(),
            LoanStatus::Approved
        );
    }

    #[test]
    fn test_settle_is_not_requestable() {
        let admin = Actor::new(Uuid::new_v4(), UserRole::SuperAdmin);
        let snap = snapshot(LoanStatus::Disbursed, Uuid::new_v4());
        assert!(authorize(&snap, &admin, LoanAction::Settle, &GateRules::default()).is_err());
    }

    #[test]
    fn test_available_actions_for_disbursed_loan() {
        let admin = Actor::new(Uuid::new_v4(), UserRole::SuperAdmin);
        let snap = snapshot(LoanStatus::Disbursed, Uuid::new_v4());

        let actions = available_actions(&snap, &admin, &GateRules::default());
        assert_eq!(
            actions,
            vec![LoanAction::RecordRepayment, LoanAction::MarkDefaulted]
        );
    }
}

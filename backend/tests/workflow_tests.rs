//! Loan workflow gate tests
//!
//! Pure checks over snapshots: no database required.

use uuid::Uuid;

use lendflow_server::assessment::FiveCScores;
use lendflow_server::models::UserRole;
use lendflow_server::workflow::{
    authorize, available_actions, Actor, GateRules, LoanAction, LoanSnapshot, LoanStatus,
    Permission, Policy, WorkflowError, TRANSITIONS,
};

fn snapshot(status: LoanStatus, initiated_by: Uuid) -> LoanSnapshot {
    LoanSnapshot {
        loan_id: Uuid::new_v4(),
        status,
        initiated_by,
        assessment_count: 0,
        latest_score: None,
        accepted_guarantors: 0,
        approvals: Vec::new(),
    }
}

fn ready(status: LoanStatus, initiated_by: Uuid) -> LoanSnapshot {
    LoanSnapshot {
        assessment_count: 1,
        latest_score: Some(20),
        accepted_guarantors: 1,
        ..snapshot(status, initiated_by)
    }
}

fn actor(role: UserRole) -> Actor {
    Actor::new(Uuid::new_v4(), role)
}

#[test]
fn initiator_never_acts_as_checker() {
    let rules = GateRules::default();

    for role in UserRole::ALL {
        let initiator = actor(role);
        for status in [LoanStatus::Initiated, LoanStatus::Approved] {
            let snap = ready(status, initiator.user_id);
            for action in [
                LoanAction::Approve,
                LoanAction::Reject,
                LoanAction::Disburse,
                LoanAction::Cancel,
            ] {
                assert!(
                    authorize(&snap, &initiator, action, &rules).is_err(),
                    "{} initiator was allowed to {} a {} loan",
                    role,
                    action,
                    status
                );
            }
        }
    }
}

#[test]
fn disburse_requires_every_prerequisite() {
    let rules = GateRules::default();
    let initiator = Uuid::new_v4();

    for role in UserRole::ALL {
        let who = actor(role);
        let allowed = authorize(&ready(LoanStatus::Approved, initiator), &who, LoanAction::Disburse, &rules);
        let expected = matches!(role, UserRole::SuperAdmin | UserRole::ApproverAdmin);
        assert_eq!(allowed.is_ok(), expected, "role {}", role);
    }

    let approver = actor(UserRole::ApproverAdmin);

    let mut snap = ready(LoanStatus::Approved, initiator);
    snap.assessment_count = 0;
    assert!(matches!(
        authorize(&snap, &approver, LoanAction::Disburse, &rules),
        Err(WorkflowError::MissingAssessment)
    ));

    let mut snap = ready(LoanStatus::Approved, initiator);
    snap.accepted_guarantors = 0;
    assert!(matches!(
        authorize(&snap, &approver, LoanAction::Disburse, &rules),
        Err(WorkflowError::InsufficientGuarantors { required: 1, found: 0 })
    ));

    for status in LoanStatus::ALL {
        if status == LoanStatus::Approved {
            continue;
        }
        let snap = ready(status, initiator);
        assert!(authorize(&snap, &approver, LoanAction::Disburse, &rules).is_err());
    }
}

#[test]
fn approve_appears_only_once_prerequisites_are_met() {
    let rules = GateRules::default();
    let officer = actor(UserRole::LoanOfficer);
    let approver = actor(UserRole::ApproverAdmin);

    // Initiated, no assessment, two pending guarantors
    let mut snap = snapshot(LoanStatus::Initiated, officer.user_id);
    assert!(!available_actions(&snap, &approver, &rules).contains(&LoanAction::Approve));

    snap.accepted_guarantors = 1;
    snap.assessment_count = 1;
    snap.latest_score = Some(20);
    assert!(available_actions(&snap, &approver, &rules).contains(&LoanAction::Approve));

    let initiator_as_approver = Actor::new(officer.user_id, UserRole::ApproverAdmin);
    assert!(!available_actions(&snap, &initiator_as_approver, &rules).contains(&LoanAction::Approve));
}

#[test]
fn low_score_is_confirmable_not_blocking() {
    let scores = FiveCScores::new(3, 3, 3, 3, 3).unwrap();
    assert_eq!(scores.total(), 15);
    assert!(scores.check_submission(18, false).is_err());
    assert!(scores.check_submission(18, true).unwrap());

    for total in 5..=25 {
        let base = total / 5;
        let extra = total % 5;
        let parts: Vec<i32> = (0..5).map(|i| base + i32::from(i < extra)).collect();
        let scores = FiveCScores::new(parts[0], parts[1], parts[2], parts[3], parts[4]).unwrap();
        assert_eq!(scores.total(), total);
        assert_eq!(scores.check_submission(18, false).is_ok(), total >= 18);
    }
}

#[test]
fn no_illegal_jumps() {
    let rules = GateRules::default();
    let admin = actor(UserRole::SuperAdmin);
    let snap = ready(LoanStatus::Initiated, Uuid::new_v4());

    let err = authorize(&snap, &admin, LoanAction::Disburse, &rules).unwrap_err();
    assert!(matches!(err, WorkflowError::IllegalTransition { .. }));
    assert_eq!(err.to_string(), "Cannot disburse a loan that is initiated");

    for (from, _, to) in TRANSITIONS {
        assert!(!from.is_terminal(), "{} listed as a source but terminal", from);
        if to.is_terminal() {
            for action in LoanAction::REQUESTABLE {
                assert!(to.transition(action).is_err());
            }
        }
    }
}

#[test]
fn multiple_approvals_collected_before_status_moves() {
    let rules = GateRules {
        min_accepted_guarantors: 1,
        required_approvals: 2,
    };
    let mut snap = ready(LoanStatus::Initiated, Uuid::new_v4());
    let first = actor(UserRole::ApproverAdmin);
    let second = actor(UserRole::ApproverAdmin);

    assert_eq!(
        authorize(&snap, &first, LoanAction::Approve, &rules).unwrap(),
        LoanStatus::Initiated
    );
    snap.approvals.push(first.user_id);

    assert!(matches!(
        authorize(&snap, &first, LoanAction::Approve, &rules),
        Err(WorkflowError::AlreadyApproved)
    ));
    assert_eq!(
        authorize(&snap, &second, LoanAction::Approve, &rules).unwrap(),
        LoanStatus::Approved
    );
}

#[test]
fn repayment_open_to_every_role() {
    let rules = GateRules::default();
    let snap = ready(LoanStatus::Disbursed, Uuid::new_v4());
    for role in UserRole::ALL {
        assert!(Policy::permits(role, Permission::RecordRepayment));
        assert_eq!(
            authorize(&snap, &actor(role), LoanAction::RecordRepayment, &rules).unwrap(),
            LoanStatus::Disbursed
        );
    }
}

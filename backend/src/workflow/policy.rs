//! Central authorization policy
//!
//! Maps `(role, permission)` to allowed. Handlers and the loan guards both go
//! through [`Policy::require`]; nothing else compares roles.

use std::fmt;

use serde::Serialize;

use super::{LoanAction, WorkflowError};
use crate::models::UserRole;

use UserRole::{ApproverAdmin, InitiatorAdmin, LoanOfficer, SuperAdmin};

/// Everything a staff user can be allowed to do
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    InitiateLoan,
    AssessLoan,
    ApproveLoan,
    RejectLoan,
    DisburseLoan,
    RecordRepayment,
    CancelLoan,
    MarkDefaulted,
    ViewLoans,
    AddGuarantor,
    DecideGuarantor,
    ManageClients,
    ManageGroups,
    AdjustSavings,
    DepositSavings,
    ManageUsers,
    ViewAuditLog,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::InitiateLoan => "initiate loans",
            Permission::AssessLoan => "assess loans",
            Permission::ApproveLoan => "approve loans",
            Permission::RejectLoan => "reject loans",
            Permission::DisburseLoan => "disburse loans",
            Permission::RecordRepayment => "record repayments",
            Permission::CancelLoan => "cancel loans",
            Permission::MarkDefaulted => "mark loans as defaulted",
            Permission::ViewLoans => "view loans",
            Permission::AddGuarantor => "add guarantors",
            Permission::DecideGuarantor => "accept or reject guarantors",
            Permission::ManageClients => "manage clients",
            Permission::ManageGroups => "manage groups",
            Permission::AdjustSavings => "add to or deduct from savings",
            Permission::DepositSavings => "deposit savings",
            Permission::ManageUsers => "manage staff users",
            Permission::ViewAuditLog => "view the audit log",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LoanAction> for Permission {
    fn from(action: LoanAction) -> Self {
        match action {
            LoanAction::Assess => Permission::AssessLoan,
            LoanAction::Approve => Permission::ApproveLoan,
            LoanAction::Reject => Permission::RejectLoan,
            LoanAction::Disburse => Permission::DisburseLoan,
            LoanAction::RecordRepayment | LoanAction::Settle => Permission::RecordRepayment,
            LoanAction::Cancel => Permission::CancelLoan,
            LoanAction::MarkDefaulted => Permission::MarkDefaulted,
        }
    }
}

/// Role × permission lookup table
pub struct Policy;

impl Policy {
    /// Roles granted a permission
    pub fn roles_for(permission: Permission) -> &'static [UserRole] {
        match permission {
            Permission::InitiateLoan => &[LoanOfficer],
            Permission::AssessLoan => &[SuperAdmin, InitiatorAdmin, ApproverAdmin],
            Permission::ApproveLoan | Permission::RejectLoan => &[ApproverAdmin],
            Permission::DisburseLoan | Permission::CancelLoan => &[SuperAdmin, ApproverAdmin],
            Permission::MarkDefaulted => &[SuperAdmin],
            Permission::RecordRepayment
            | Permission::ViewLoans
            | Permission::DepositSavings => &[SuperAdmin, InitiatorAdmin, ApproverAdmin, LoanOfficer],
            Permission::AddGuarantor | Permission::ManageClients | Permission::ManageGroups => {
                &[SuperAdmin, InitiatorAdmin, LoanOfficer]
            }
            Permission::DecideGuarantor => &[SuperAdmin, InitiatorAdmin, ApproverAdmin],
            Permission::AdjustSavings | Permission::ManageUsers | Permission::ViewAuditLog => {
                &[SuperAdmin]
            }
        }
    }

    pub fn permits(role: UserRole, permission: Permission) -> bool {
        Self::roles_for(permission).contains(&role)
    }

    pub fn require(role: UserRole, permission: Permission) -> Result<(), WorkflowError> {
        if Self::permits(role, permission) {
            Ok(())
        } else {
            Err(WorkflowError::NotPermitted { role, permission })
        }
    }

    /// All permissions held by a role
    pub fn permissions_of(role: UserRole) -> Vec<Permission> {
        ALL_PERMISSIONS
            .iter()
            .copied()
            .filter(|p| Self::permits(role, *p))
            .collect()
    }
}

const ALL_PERMISSIONS: [Permission; 17] = [
    Permission::InitiateLoan,
    Permission::AssessLoan,
    Permission::ApproveLoan,
    Permission::RejectLoan,
    Permission::DisburseLoan,
    Permission::RecordRepayment,
    Permission::CancelLoan,
    Permission::MarkDefaulted,
    Permission::ViewLoans,
    Permission::AddGuarantor,
    Permission::DecideGuarantor,
    Permission::ManageClients,
    Permission::ManageGroups,
    Permission::AdjustSavings,
    Permission::DepositSavings,
    Permission::ManageUsers,
    Permission::ViewAuditLog,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_loan_officers_initiate() {
        assert!(Policy::permits(LoanOfficer, Permission::InitiateLoan));
        for role in [SuperAdmin, InitiatorAdmin, ApproverAdmin] {
            assert!(!Policy::permits(role, Permission::InitiateLoan));
        }
    }

    #[test]
    fn test_only_approver_admins_approve_or_reject() {
        for role in UserRole::ALL {
            let expected = role == ApproverAdmin;
            assert_eq!(Policy::permits(role, Permission::ApproveLoan), expected);
            assert_eq!(Policy::permits(role, Permission::RejectLoan), expected);
        }
    }

    #[test]
    fn test_disbursement_roles() {
        assert!(Policy::permits(SuperAdmin, Permission::DisburseLoan));
        assert!(Policy::permits(ApproverAdmin, Permission::DisburseLoan));
        assert!(!Policy::permits(InitiatorAdmin, Permission::DisburseLoan));
        assert!(!Policy::permits(LoanOfficer, Permission::DisburseLoan));
    }

    #[test]
    fn test_any_admin_assesses() {
        assert!(Policy::permits(SuperAdmin, Permission::AssessLoan));
        assert!(Policy::permits(InitiatorAdmin, Permission::AssessLoan));
        assert!(Policy::permits(ApproverAdmin, Permission::AssessLoan));
        assert!(!Policy::permits(LoanOfficer, Permission::AssessLoan));
    }

    #[test]
    fn test_savings_scopes() {
        for role in UserRole::ALL {
            assert!(Policy::permits(role, Permission::DepositSavings));
        }
        assert!(Policy::permits(SuperAdmin, Permission::AdjustSavings));
        assert!(!Policy::permits(LoanOfficer, Permission::AdjustSavings));
    }

    #[test]
    fn test_require_reports_role_and_permission() {
        let err = Policy::require(LoanOfficer, Permission::ViewAuditLog).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("loan_officer"));
        assert!(message.contains("view the audit log"));
    }

    #[test]
    fn test_loan_actions_map_to_permissions() {
        assert_eq!(
            Permission::from(LoanAction::Approve),
            Permission::ApproveLoan
        );
        assert_eq!(
            Permission::from(LoanAction::Settle),
            Permission::RecordRepayment
        );
    }

    #[test]
    fn test_permissions_of_super_admin() {
        let perms = Policy::permissions_of(SuperAdmin);
        assert!(perms.contains(&Permission::ManageUsers));
        assert!(!perms.contains(&Permission::ApproveLoan));
        assert!(!perms.contains(&Permission::InitiateLoan));
    }
}

//! Loan lifecycle workflow
//!
//! - `state`: loan statuses and the transition table
//! - `policy`: role × permission authorization table
//! - `guards`: prerequisite and maker-checker evaluation over a loan snapshot
//!
//! Everything here is pure; services load a snapshot inside a database
//! transaction and ask this module whether the action may proceed.

mod guards;
mod policy;
mod state;

pub use guards::{authorize, available_actions, Actor, GateRules, LoanSnapshot};
pub use policy::{Permission, Policy};
pub use state::{LoanAction, LoanStatus, TRANSITIONS};

use thiserror::Error;

use crate::models::UserRole;

/// Reasons a workflow request is refused
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Role '{role}' is not permitted to {permission}")]
    NotPermitted {
        role: UserRole,
        permission: Permission,
    },

    #[error("Cannot {action} a loan that is {from}")]
    IllegalTransition { from: LoanStatus, action: LoanAction },

    #[error("{0} cannot be requested directly")]
    NotRequestable(LoanAction),

    #[error("The user who initiated a loan cannot {0} it")]
    MakerChecker(LoanAction),

    #[error("You have already approved this loan")]
    AlreadyApproved,

    #[error("A credit assessment is required before this action")]
    MissingAssessment,

    #[error("At least {required} accepted guarantor(s) required, found {found}")]
    InsufficientGuarantors { required: i64, found: i64 },

    #[error("Credit score {total} is below the minimum of {pass_score}; confirm to submit anyway")]
    LowScoreNeedsConfirmation { total: i32, pass_score: i32 },

    #[error("{0}")]
    Invalid(String),
}

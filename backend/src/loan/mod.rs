//! Loans: initiation, listings and workflow transitions

pub mod fees;
mod model;
mod service;
pub(crate) mod store;

pub use fees::FeeBreakdown;
pub use model::{
    InitiateLoanRequest, InitiatedLoan, Loan, LoanDetail, LoanFilter, LoanListResponse, LoanStats,
    LoanType, Repayment, RepaymentReceipt, RepaymentRequest, TransitionRequest,
};
pub use service::LoanService;

//! Loan workflow route definitions

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::loan::*;
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/loans/initiate", post(initiate_loan))
        .route("/api/loans/history", get(loan_history))
        .route("/api/loans/my-loans", get(my_loans))
        .route("/api/loans/:id", get(get_loan))
        .route("/api/loans/:id/approve", put(approve_loan))
        .route("/api/loans/:id/reject", put(reject_loan))
        .route("/api/loans/:id/cancel", put(cancel_loan))
        .route("/api/loans/:id/default", put(mark_loan_defaulted))
        .route("/api/loans/:id/disburse", post(disburse_loan))
        .route("/api/loans/:id/repayments", post(record_repayment))
        .route("/api/loans/:id/assessments", get(list_assessments))
        .route("/api/loans/:id/guarantors", get(list_guarantors))
        .route("/api/credit-assessments", post(create_assessment))
        .route("/api/guarantors", post(add_guarantor))
        .route("/api/guarantors/:id/accept", put(accept_guarantor))
        .route("/api/guarantors/:id/reject", put(reject_guarantor))
}

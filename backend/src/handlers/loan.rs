//! Loan workflow handlers
//!
//! Each handler passes the session's actor to the service, which runs the
//! workflow gate. The response is always the loan as re-read after the change.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::assessment::{CreateAssessmentRequest, CreditAssessment};
use crate::error::ApiError;
use crate::guarantor::{AddGuarantorRequest, Guarantor, GuarantorDecision};
use crate::loan::{
    InitiateLoanRequest, InitiatedLoan, LoanDetail, LoanFilter, LoanListResponse,
    RepaymentReceipt, RepaymentRequest, TransitionRequest,
};
use crate::state::AppState;

/// POST /api/loans/initiate
pub async fn initiate_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<InitiateLoanRequest>,
) -> Result<(StatusCode, Json<InitiatedLoan>), ApiError> {
    let loan = state.loan_service.initiate(user.actor(), req).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// GET /api/loans/history
pub async fn loan_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<LoanFilter>,
) -> Result<Json<LoanListResponse>, ApiError> {
    let loans = state.loan_service.list(user.actor(), filter, false).await?;
    Ok(Json(loans))
}

/// GET /api/loans/my-loans
pub async fn my_loans(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<LoanFilter>,
) -> Result<Json<LoanListResponse>, ApiError> {
    let loans = state.loan_service.list(user.actor(), filter, true).await?;
    Ok(Json(loans))
}

/// GET /api/loans/:id
pub async fn get_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanDetail>, ApiError> {
    let loan = state.loan_service.get_detail(user.actor(), loan_id).await?;
    Ok(Json(loan))
}

/// PUT /api/loans/:id/approve
pub async fn approve_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanDetail>, ApiError> {
    let loan = state.loan_service.approve(user.actor(), loan_id).await?;
    Ok(Json(loan))
}

/// PUT /api/loans/:id/reject
pub async fn reject_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
    body: Option<Json<TransitionRequest>>,
) -> Result<Json<LoanDetail>, ApiError> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let loan = state.loan_service.reject(user.actor(), loan_id, req).await?;
    Ok(Json(loan))
}

/// PUT /api/loans/:id/cancel
pub async fn cancel_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
    body: Option<Json<TransitionRequest>>,
) -> Result<Json<LoanDetail>, ApiError> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let loan = state.loan_service.cancel(user.actor(), loan_id, req).await?;
    Ok(Json(loan))
}

/// PUT /api/loans/:id/default
pub async fn mark_loan_defaulted(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
    body: Option<Json<TransitionRequest>>,
) -> Result<Json<LoanDetail>, ApiError> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let loan = state
        .loan_service
        .mark_defaulted(user.actor(), loan_id, req)
        .await?;
    Ok(Json(loan))
}

/// POST /api/loans/:id/disburse
pub async fn disburse_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanDetail>, ApiError> {
    let loan = state.loan_service.disburse(user.actor(), loan_id).await?;
    Ok(Json(loan))
}

/// POST /api/loans/:id/repayments
pub async fn record_repayment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
    Json(req): Json<RepaymentRequest>,
) -> Result<(StatusCode, Json<RepaymentReceipt>), ApiError> {
    let receipt = state
        .loan_service
        .record_repayment(user.actor(), loan_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// POST /api/credit-assessments
pub async fn create_assessment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateAssessmentRequest>,
) -> Result<(StatusCode, Json<CreditAssessment>), ApiError> {
    let assessment = state.assessment_service.create(user.actor(), req).await?;
    Ok((StatusCode::CREATED, Json(assessment)))
}

/// GET /api/loans/:id/assessments
pub async fn list_assessments(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<Vec<CreditAssessment>>, ApiError> {
    let assessments = state.assessment_service.list_for_loan(loan_id).await?;
    Ok(Json(assessments))
}

/// POST /api/guarantors
pub async fn add_guarantor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<AddGuarantorRequest>,
) -> Result<(StatusCode, Json<Guarantor>), ApiError> {
    let guarantor = state.guarantor_service.add(user.actor(), req).await?;
    Ok((StatusCode::CREATED, Json(guarantor)))
}

/// PUT /api/guarantors/:id/accept
pub async fn accept_guarantor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(guarantor_id): Path<Uuid>,
) -> Result<Json<Guarantor>, ApiError> {
    let guarantor = state
        .guarantor_service
        .decide(user.actor(), guarantor_id, GuarantorDecision::Accept)
        .await?;
    Ok(Json(guarantor))
}

/// PUT /api/guarantors/:id/reject
pub async fn reject_guarantor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(guarantor_id): Path<Uuid>,
) -> Result<Json<Guarantor>, ApiError> {
    let guarantor = state
        .guarantor_service
        .decide(user.actor(), guarantor_id, GuarantorDecision::Reject)
        .await?;
    Ok(Json(guarantor))
}

/// GET /api/loans/:id/guarantors
pub async fn list_guarantors(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<Vec<Guarantor>>, ApiError> {
    let guarantors = state.guarantor_service.list_for_loan(loan_id).await?;
    Ok(Json(guarantors))
}

//! Loan row access shared by the workflow services

use sqlx::PgConnection;
use uuid::Uuid;

use super::model::Loan;
use crate::error::ApiError;
use crate::workflow::LoanSnapshot;

pub async fn fetch_loan(conn: &mut PgConnection, loan_id: Uuid) -> Result<Loan, ApiError> {
    sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
        .bind(loan_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Loan {} not found", loan_id)))
}

/// Fetch the loan row locked for the rest of the transaction
pub async fn lock_loan(conn: &mut PgConnection, loan_id: Uuid) -> Result<Loan, ApiError> {
    sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
        .bind(loan_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Loan {} not found", loan_id)))
}

/// Gate input for `loan`, read on the same connection
pub async fn snapshot_of(conn: &mut PgConnection, loan: &Loan) -> Result<LoanSnapshot, ApiError> {
    let (assessment_count, latest_score): (i64, Option<i32>) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*)::BIGINT,
            (SELECT total_score FROM credit_assessments
             WHERE loan_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1)
        FROM credit_assessments
        WHERE loan_id = $1
        "#,
    )
    .bind(loan.id)
    .fetch_one(&mut *conn)
    .await?;

    let accepted_guarantors: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)::BIGINT FROM guarantors WHERE loan_id = $1 AND status = 'accepted'",
    )
    .bind(loan.id)
    .fetch_one(&mut *conn)
    .await?;

    let approvals = approvers_of(conn, loan.id).await?;

    Ok(LoanSnapshot {
        loan_id: loan.id,
        status: loan.status,
        initiated_by: loan.initiated_by,
        assessment_count,
        latest_score,
        accepted_guarantors,
        approvals,
    })
}

pub async fn approvers_of(conn: &mut PgConnection, loan_id: Uuid) -> Result<Vec<Uuid>, ApiError> {
    let approvers = sqlx::query_scalar::<_, Uuid>(
        "SELECT approver_id FROM loan_approvals WHERE loan_id = $1 ORDER BY created_at",
    )
    .bind(loan_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(approvers)
}

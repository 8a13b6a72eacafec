use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::model::{AddGuarantorRequest, Guarantor, GuarantorDecision, GuarantorInput, GuarantorStatus};
use crate::audit::{self, NewAuditEntry};
use crate::error::ApiError;
use crate::loan::{store, Loan};
use crate::workflow::{Actor, Permission, Policy, WorkflowError};

#[derive(Clone)]
pub struct GuarantorService {
    db_pool: PgPool,
}

impl GuarantorService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Add a single guarantor to a pending loan. Identity documents are
    /// required here, unlike the bulk rows supplied on initiation.
    pub async fn add(&self, actor: Actor, request: AddGuarantorRequest) -> Result<Guarantor, ApiError> {
        Policy::require(actor.role, Permission::AddGuarantor)?;
        request.validate()?;

        if !request.guarantor.is_identified() {
            return Err(WorkflowError::Invalid(
                "Guarantor name and national ID are required".to_string(),
            )
            .into());
        }
        if !request.guarantor.has_documents() {
            return Err(WorkflowError::Invalid(
                "Guarantor ID document and photo are required".to_string(),
            )
            .into());
        }

        let mut tx = self.db_pool.begin().await?;

        let loan = store::lock_loan(&mut tx, request.loan_id).await?;
        ensure_open(&loan)?;

        let guarantor = insert(&mut tx, loan.id, &request.guarantor, actor.user_id).await?;

        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, "guarantor.add", "guarantor", guarantor.id)
                .with_details(serde_json::json!({ "loan_id": loan.id })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = %loan.id,
            guarantor_id = %guarantor.id,
            actor = %actor.user_id,
            "Guarantor added"
        );

        Ok(guarantor)
    }

    /// Accept or reject a guarantor. The latest decision wins.
    pub async fn decide(
        &self,
        actor: Actor,
        guarantor_id: Uuid,
        decision: GuarantorDecision,
    ) -> Result<Guarantor, ApiError> {
        Policy::require(actor.role, Permission::DecideGuarantor)?;

        let mut tx = self.db_pool.begin().await?;

        let loan_id: Uuid = sqlx::query_scalar("SELECT loan_id FROM guarantors WHERE id = $1")
            .bind(guarantor_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Guarantor {} not found", guarantor_id)))?;

        let loan = store::lock_loan(&mut tx, loan_id).await?;
        ensure_open(&loan)?;

        let guarantor = sqlx::query_as::<_, Guarantor>(
            r#"
            UPDATE guarantors
            SET status = $1, decided_by = $2, decided_at = $3, updated_at = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(decision.status())
        .bind(actor.user_id)
        .bind(Utc::now())
        .bind(guarantor_id)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, decision.audit_action(), "guarantor", guarantor.id)
                .with_details(serde_json::json!({ "loan_id": loan.id })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = %loan.id,
            guarantor_id = %guarantor.id,
            status = ?guarantor.status,
            actor = %actor.user_id,
            "Guarantor decided"
        );

        Ok(guarantor)
    }

    pub async fn list_for_loan(&self, loan_id: Uuid) -> Result<Vec<Guarantor>, ApiError> {
        let mut conn = self.db_pool.acquire().await?;
        store::fetch_loan(&mut conn, loan_id).await?;
        for_loan(&mut conn, loan_id).await
    }
}

fn ensure_open(loan: &Loan) -> Result<(), ApiError> {
    if loan.status.accepts_guarantor_changes() {
        Ok(())
    } else {
        Err(ApiError::Conflict(format!(
            "Guarantors cannot be changed on a loan that is {}",
            loan.status
        )))
    }
}

/// Insert a pending guarantor row
pub(crate) async fn insert(
    conn: &mut PgConnection,
    loan_id: Uuid,
    input: &GuarantorInput,
    added_by: Uuid,
) -> Result<Guarantor, ApiError> {
    let guarantor = sqlx::query_as::<_, Guarantor>(
        r#"
        INSERT INTO guarantors (
            id, loan_id, name, national_id, phone, relationship,
            id_document_url, photo_url, status, added_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(loan_id)
    .bind(input.name.trim())
    .bind(input.national_id.trim())
    .bind(&input.phone)
    .bind(&input.relationship)
    .bind(&input.id_document_url)
    .bind(&input.photo_url)
    .bind(GuarantorStatus::Pending)
    .bind(added_by)
    .fetch_one(&mut *conn)
    .await?;

    Ok(guarantor)
}

pub(crate) async fn for_loan(conn: &mut PgConnection, loan_id: Uuid) -> Result<Vec<Guarantor>, ApiError> {
    let guarantors = sqlx::query_as::<_, Guarantor>(
        "SELECT * FROM guarantors WHERE loan_id = $1 ORDER BY created_at, id",
    )
    .bind(loan_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(guarantors)
}

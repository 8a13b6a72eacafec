//! Loan service layer - initiation, listings and workflow transitions
//!
//! Every transition follows the same shape: lock the loan row, build a
//! [`LoanSnapshot`](crate::workflow::LoanSnapshot) on the same transaction,
//! ask [`authorize`] for the target status, write the change plus an audit
//! entry, commit, and return the loan as re-read from the database.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;
use validator::Validate;

use super::fees::{self, FeeBreakdown};
use super::model::{
    InitiateLoanRequest, InitiatedLoan, Loan, LoanDetail, LoanFilter, LoanListResponse, LoanStats,
    LoanType, Repayment, RepaymentReceipt, RepaymentRequest, TransitionRequest,
};
use super::store;
use crate::assessment::CreditAssessment;
use crate::audit::{self, NewAuditEntry};
use crate::config::WorkflowConfig;
use crate::error::ApiError;
use crate::group::GroupStatus;
use crate::guarantor::service as guarantors;
use crate::payments::{PaymentRail, TransferReceipt, TransferRequest};
use crate::workflow::{
    authorize, available_actions, Actor, GateRules, LoanAction, LoanStatus, Permission, Policy,
    WorkflowError,
};

/// Loan service for managing the loan lifecycle
#[derive(Clone)]
pub struct LoanService {
    db_pool: PgPool,
    config: WorkflowConfig,
    rules: GateRules,
    payment_rail: Arc<dyn PaymentRail>,
}

impl LoanService {
    pub fn new(db_pool: PgPool, config: WorkflowConfig, payment_rail: Arc<dyn PaymentRail>) -> Self {
        let rules = GateRules::from(&config);
        Self {
            db_pool,
            config,
            rules,
            payment_rail,
        }
    }

    /// Create a loan in `initiated` with its guarantors pending
    pub async fn initiate(
        &self,
        actor: Actor,
        request: InitiateLoanRequest,
    ) -> Result<InitiatedLoan, ApiError> {
        Policy::require(actor.role, Permission::InitiateLoan)?;
        request.validate()?;
        request.check(self.config.min_individual_guarantors)?;

        let mut tx = self.db_pool.begin().await?;

        match request.loan_type {
            LoanType::Individual => {
                let client_id = request.client_id.unwrap_or_default();
                let savings_balance: i64 =
                    sqlx::query_scalar("SELECT savings_balance FROM clients WHERE id = $1")
                        .bind(client_id)
                        .fetch_optional(&mut *tx)
                        .await?
                        .ok_or_else(|| {
                            ApiError::NotFound(format!("Client {} not found", client_id))
                        })?;

                fees::check_savings_requirement(
                    savings_balance,
                    request.amount,
                    self.config.savings_requirement_pct,
                )?;
            }
            LoanType::Group => {
                let group_id = request.group_id.unwrap_or_default();
                let status: GroupStatus =
                    sqlx::query_scalar("SELECT status FROM groups WHERE id = $1")
                        .bind(group_id)
                        .fetch_optional(&mut *tx)
                        .await?
                        .ok_or_else(|| ApiError::NotFound(format!("Group {} not found", group_id)))?;

                if status != GroupStatus::Active {
                    return Err(WorkflowError::Invalid(format!(
                        "Group must be active to borrow, it is {}",
                        status
                    ))
                    .into());
                }
            }
        }

        let now = Utc::now();
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (
                id, loan_type, client_id, group_id, product, principal,
                interest_rate_bps, term_months, status, outstanding_balance,
                initiated_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, $10, $11, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.loan_type)
        .bind(request.client_id)
        .bind(request.group_id)
        .bind(request.product.trim())
        .bind(request.amount)
        .bind(request.interest_rate_bps.unwrap_or(0))
        .bind(request.term_months)
        .bind(LoanStatus::initial())
        .bind(actor.user_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut guarantor_count = 0;
        for input in request.identified_guarantors() {
            guarantors::insert(&mut tx, loan.id, input, actor.user_id).await?;
            guarantor_count += 1;
        }

        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, "loan.initiate", "loan", loan.id).with_details(
                serde_json::json!({
                    "loan_type": loan.loan_type,
                    "principal": loan.principal,
                    "guarantors": guarantor_count,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = %loan.id,
            actor = %actor.user_id,
            loan_type = ?loan.loan_type,
            principal = loan.principal,
            "Loan initiated"
        );

        let fees = FeeBreakdown::compute(loan.principal, &self.config);
        let detail = self.get_detail(actor, loan.id).await?;

        Ok(InitiatedLoan { loan: detail, fees })
    }

    /// Loan with guarantors, assessments and the caller's allowed actions
    pub async fn get_detail(&self, actor: Actor, loan_id: Uuid) -> Result<LoanDetail, ApiError> {
        Policy::require(actor.role, Permission::ViewLoans)?;

        let mut conn = self.db_pool.acquire().await?;
        self.detail_on(&mut conn, actor, loan_id).await
    }

    async fn detail_on(
        &self,
        conn: &mut PgConnection,
        actor: Actor,
        loan_id: Uuid,
    ) -> Result<LoanDetail, ApiError> {
        let loan = store::fetch_loan(conn, loan_id).await?;
        let snapshot = store::snapshot_of(conn, &loan).await?;
        let guarantors = guarantors::for_loan(conn, loan_id).await?;
        let assessments = sqlx::query_as::<_, CreditAssessment>(
            "SELECT * FROM credit_assessments WHERE loan_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(loan_id)
        .fetch_all(&mut *conn)
        .await?;

        let allowed_actions = available_actions(&snapshot, &actor, &self.rules);

        Ok(LoanDetail {
            loan,
            approved_by: snapshot.approvals,
            accepted_guarantors: snapshot.accepted_guarantors,
            latest_score: snapshot.latest_score,
            guarantors,
            assessments,
            allowed_actions,
        })
    }

    /// Filtered, paginated listing. `mine` restricts to loans the caller initiated.
    pub async fn list(
        &self,
        actor: Actor,
        filter: LoanFilter,
        mine: bool,
    ) -> Result<LoanListResponse, ApiError> {
        Policy::require(actor.role, Permission::ViewLoans)?;

        let (page, limit, offset) = filter.pagination().resolve();
        let initiated_by = mine.then_some(actor.user_id);

        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*)::BIGINT FROM loans WHERE 1=1");
        push_filters(&mut count, &filter, initiated_by);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db_pool).await?;

        let mut select: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM loans WHERE 1=1");
        push_filters(&mut select, &filter, initiated_by);
        select.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        select.push_bind(limit);
        select.push(" OFFSET ");
        select.push_bind(offset);
        let data = select
            .build_query_as::<Loan>()
            .fetch_all(&self.db_pool)
            .await?;

        let mut grouped: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"SELECT status, COUNT(*)::BIGINT,
                   COALESCE(SUM(principal), 0)::BIGINT,
                   COALESCE(SUM(outstanding_balance), 0)::BIGINT
               FROM loans WHERE 1=1"#,
        );
        push_filters(&mut grouped, &filter, initiated_by);
        grouped.push(" GROUP BY status");
        let rows = grouped
            .build_query_as::<(LoanStatus, i64, i64, i64)>()
            .fetch_all(&self.db_pool)
            .await?;

        let mut stats = LoanStats::default();
        for (status, count, principal, outstanding) in rows {
            stats.by_status.insert(status, count);
            stats.total_principal += principal;
            stats.total_outstanding += outstanding;
        }

        Ok(LoanListResponse {
            data,
            total,
            page,
            limit,
            stats,
        })
    }

    /// Record one approval; the loan moves to `approved` once enough distinct
    /// approvers have signed off.
    pub async fn approve(&self, actor: Actor, loan_id: Uuid) -> Result<LoanDetail, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let loan = store::lock_loan(&mut tx, loan_id).await?;
        let snapshot = store::snapshot_of(&mut tx, &loan).await?;
        let target = authorize(&snapshot, &actor, LoanAction::Approve, &self.rules)?;

        sqlx::query("INSERT INTO loan_approvals (loan_id, approver_id) VALUES ($1, $2)")
            .bind(loan.id)
            .bind(actor.user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match ApiError::from(e) {
                ApiError::Conflict(_) => ApiError::from(WorkflowError::AlreadyApproved),
                other => other,
            })?;

        if target != loan.status {
            set_status(&mut tx, loan.id, target).await?;
        }

        let approvals = snapshot.approvals.len() + 1;
        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, "loan.approve", "loan", loan.id).with_details(
                serde_json::json!({
                    "approvals": approvals,
                    "required_approvals": self.rules.required_approvals,
                    "status": target,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = %loan.id,
            action = %LoanAction::Approve,
            actor = %actor.user_id,
            approvals,
            status = %target,
            "Loan approval recorded"
        );

        self.get_detail(actor, loan.id).await
    }

    pub async fn reject(
        &self,
        actor: Actor,
        loan_id: Uuid,
        request: TransitionRequest,
    ) -> Result<LoanDetail, ApiError> {
        self.close(actor, loan_id, LoanAction::Reject, request).await
    }

    pub async fn cancel(
        &self,
        actor: Actor,
        loan_id: Uuid,
        request: TransitionRequest,
    ) -> Result<LoanDetail, ApiError> {
        self.close(actor, loan_id, LoanAction::Cancel, request).await
    }

    pub async fn mark_defaulted(
        &self,
        actor: Actor,
        loan_id: Uuid,
        request: TransitionRequest,
    ) -> Result<LoanDetail, ApiError> {
        self.close(actor, loan_id, LoanAction::MarkDefaulted, request).await
    }

    /// Transitions into a terminal status that carry no other side effect
    async fn close(
        &self,
        actor: Actor,
        loan_id: Uuid,
        action: LoanAction,
        request: TransitionRequest,
    ) -> Result<LoanDetail, ApiError> {
        request.validate()?;

        let mut tx = self.db_pool.begin().await?;

        let loan = store::lock_loan(&mut tx, loan_id).await?;
        let snapshot = store::snapshot_of(&mut tx, &loan).await?;
        let target = authorize(&snapshot, &actor, action, &self.rules)?;

        set_status(&mut tx, loan.id, target).await?;

        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, format!("loan.{}", action), "loan", loan.id).with_details(
                serde_json::json!({
                    "from": loan.status,
                    "to": target,
                    "reason": request.reason,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = %loan.id,
            action = %action,
            actor = %actor.user_id,
            from = %loan.status,
            to = %target,
            "Loan transitioned"
        );

        self.get_detail(actor, loan.id).await
    }

    /// Send the net principal over the payment rail and open the repayment balance
    pub async fn disburse(&self, actor: Actor, loan_id: Uuid) -> Result<LoanDetail, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let loan = store::lock_loan(&mut tx, loan_id).await?;
        let snapshot = store::snapshot_of(&mut tx, &loan).await?;
        let target = authorize(&snapshot, &actor, LoanAction::Disburse, &self.rules)?;

        let recipient = loan.recipient().ok_or_else(|| {
            ApiError::InternalError(format!("Loan {} has no recipient", loan.id))
        })?;
        let amount = FeeBreakdown::compute(loan.principal, &self.config)
            .map(|f| f.net_disbursement)
            .unwrap_or(loan.principal);

        let transfer = TransferRequest::for_loan(loan.id, recipient, amount);
        let receipt = self.payment_rail.transfer(&transfer).await?;

        // Funds have left the rail from here on. A failed write must be
        // reconciled by hand; retrying reuses the same transfer reference.
        let outstanding = fees::total_repayable(loan.principal, loan.interest_rate_bps);
        if let Err(e) = self
            .record_disbursement(tx, &loan, actor, target, amount, outstanding, &receipt)
            .await
        {
            tracing::error!(
                loan_id = %loan.id,
                transfer_id = %receipt.transfer_id,
                reference = %transfer.reference,
                amount,
                error = %e,
                "Transfer completed but disbursement was not recorded"
            );
            return Err(e);
        }

        tracing::info!(
            loan_id = %loan.id,
            action = %LoanAction::Disburse,
            actor = %actor.user_id,
            amount,
            transfer_id = %receipt.transfer_id,
            "Loan disbursed"
        );

        self.get_detail(actor, loan.id).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_disbursement(
        &self,
        mut tx: Transaction<'_, Postgres>,
        loan: &Loan,
        actor: Actor,
        target: LoanStatus,
        amount: i64,
        outstanding: i64,
        receipt: &TransferReceipt,
    ) -> Result<(), ApiError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE loans
            SET status = $1, disbursed_by = $2, disbursement_reference = $3,
                disbursed_at = $4, outstanding_balance = $5, updated_at = $4
            WHERE id = $6
            "#,
        )
        .bind(target)
        .bind(actor.user_id)
        .bind(&receipt.transfer_id)
        .bind(now)
        .bind(outstanding)
        .bind(loan.id)
        .execute(&mut *tx)
        .await?;

        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, "loan.disburse", "loan", loan.id).with_details(
                serde_json::json!({
                    "amount": amount,
                    "outstanding_balance": outstanding,
                    "transfer_id": receipt.transfer_id,
                    "rail": self.payment_rail.name(),
                }),
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Apply a repayment; the loan settles to `repaid` when the balance hits zero
    pub async fn record_repayment(
        &self,
        actor: Actor,
        loan_id: Uuid,
        request: RepaymentRequest,
    ) -> Result<RepaymentReceipt, ApiError> {
        request.validate()?;

        let mut tx = self.db_pool.begin().await?;

        let loan = store::lock_loan(&mut tx, loan_id).await?;
        let snapshot = store::snapshot_of(&mut tx, &loan).await?;
        authorize(&snapshot, &actor, LoanAction::RecordRepayment, &self.rules)?;

        if request.amount > loan.outstanding_balance {
            tracing::warn!(
                loan_id = %loan.id,
                amount = request.amount,
                outstanding = loan.outstanding_balance,
                "Repayment exceeds outstanding balance"
            );
        }

        let balance_after = (loan.outstanding_balance - request.amount).max(0);

        let repayment = sqlx::query_as::<_, Repayment>(
            r#"
            INSERT INTO repayments (id, loan_id, amount, balance_after, recorded_by, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(loan.id)
        .bind(request.amount)
        .bind(balance_after)
        .bind(actor.user_id)
        .bind(&request.note)
        .fetch_one(&mut *tx)
        .await?;

        let status = if balance_after == 0 {
            loan.status.transition(LoanAction::Settle)?
        } else {
            loan.status
        };

        let updated = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET outstanding_balance = $1, status = $2, updated_at = $3,
                closed_at = CASE WHEN $2 = 'repaid'::loan_status THEN $3 ELSE closed_at END
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(balance_after)
        .bind(status)
        .bind(Utc::now())
        .bind(loan.id)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, "loan.record_repayment", "loan", loan.id).with_details(
                serde_json::json!({
                    "repayment_id": repayment.id,
                    "amount": repayment.amount,
                    "balance_after": balance_after,
                    "status": status,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = %loan.id,
            action = %LoanAction::RecordRepayment,
            actor = %actor.user_id,
            amount = repayment.amount,
            balance_after,
            "Repayment recorded"
        );
        if status == LoanStatus::Repaid {
            tracing::info!(loan_id = %loan.id, "Loan fully repaid");
        }

        Ok(RepaymentReceipt {
            repayment,
            loan: updated,
        })
    }
}

async fn set_status(conn: &mut PgConnection, loan_id: Uuid, status: LoanStatus) -> Result<(), ApiError> {
    let now = Utc::now();
    let closed_at = status.is_terminal().then_some(now);

    sqlx::query(
        "UPDATE loans SET status = $1, updated_at = $2, closed_at = COALESCE($3, closed_at) WHERE id = $4",
    )
    .bind(status)
    .bind(now)
    .bind(closed_at)
    .bind(loan_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &LoanFilter, initiated_by: Option<Uuid>) {
    if let Some(user_id) = initiated_by {
        builder.push(" AND initiated_by = ");
        builder.push_bind(user_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    if let Some(loan_type) = filter.loan_type {
        builder.push(" AND loan_type = ");
        builder.push_bind(loan_type);
    }
    if let Some(product) = &filter.product {
        builder.push(" AND product = ");
        builder.push_bind(product.clone());
    }
    if let Some(client_id) = filter.client_id {
        builder.push(" AND client_id = ");
        builder.push_bind(client_id);
    }
    if let Some(group_id) = filter.group_id {
        builder.push(" AND group_id = ");
        builder.push_bind(group_id);
    }
    if let Some(from) = filter.from {
        builder.push(" AND created_at >= ");
        builder.push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND created_at <= ");
        builder.push_bind(to);
    }
}

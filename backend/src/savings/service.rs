use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::model::{apply_to_balance, AdjustSavingsRequest, DepositRequest, SavingsTransaction};
use crate::audit::{self, NewAuditEntry};
use crate::error::ApiError;
use crate::workflow::{Actor, Permission, Policy};

#[derive(Clone)]
pub struct SavingsService {
    db_pool: PgPool,
}

impl SavingsService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Add to a client's savings
    pub async fn deposit(
        &self,
        actor: Actor,
        client_id: Uuid,
        request: DepositRequest,
    ) -> Result<SavingsTransaction, ApiError> {
        Policy::require(actor.role, Permission::DepositSavings)?;
        request.validate()?;

        self.post(actor, client_id, request.amount, request.note).await
    }

    /// Add or deduct without restriction other than a non-negative balance
    pub async fn adjust(
        &self,
        actor: Actor,
        request: AdjustSavingsRequest,
    ) -> Result<SavingsTransaction, ApiError> {
        Policy::require(actor.role, Permission::AdjustSavings)?;
        request.validate()?;

        self.post(actor, request.client_id, request.amount, request.note).await
    }

    pub async fn history(&self, client_id: Uuid) -> Result<Vec<SavingsTransaction>, ApiError> {
        let rows = sqlx::query_as::<_, SavingsTransaction>(
            "SELECT * FROM savings_transactions WHERE client_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(client_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(rows)
    }

    async fn post(
        &self,
        actor: Actor,
        client_id: Uuid,
        amount: i64,
        note: Option<String>,
    ) -> Result<SavingsTransaction, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let balance: i64 =
            sqlx::query_scalar("SELECT savings_balance FROM clients WHERE id = $1 FOR UPDATE")
                .bind(client_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Client {} not found", client_id)))?;

        let (balance_after, kind) = apply_to_balance(balance, amount)?;

        sqlx::query("UPDATE clients SET savings_balance = $1, updated_at = $2 WHERE id = $3")
            .bind(balance_after)
            .bind(Utc::now())
            .bind(client_id)
            .execute(&mut *tx)
            .await?;

        let entry = sqlx::query_as::<_, SavingsTransaction>(
            r#"
            INSERT INTO savings_transactions (id, client_id, amount, kind, balance_after, recorded_by, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(client_id)
        .bind(amount)
        .bind(kind)
        .bind(balance_after)
        .bind(actor.user_id)
        .bind(&note)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, "savings.post", "client", client_id).with_details(
                serde_json::json!({
                    "transaction_id": entry.id,
                    "amount": amount,
                    "balance_after": balance_after,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            client_id = %client_id,
            actor = %actor.user_id,
            amount,
            balance_after,
            "Savings transaction posted"
        );

        Ok(entry)
    }
}

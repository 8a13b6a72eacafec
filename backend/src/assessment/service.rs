use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::model::{CreateAssessmentRequest, CreditAssessment};
use crate::audit::{self, NewAuditEntry};
use crate::config::WorkflowConfig;
use crate::error::ApiError;
use crate::loan::store;
use crate::workflow::{authorize, Actor, GateRules, LoanAction};

#[derive(Clone)]
pub struct AssessmentService {
    db_pool: PgPool,
    rules: GateRules,
    pass_score: i32,
}

impl AssessmentService {
    pub fn new(db_pool: PgPool, config: &WorkflowConfig) -> Self {
        Self {
            db_pool,
            rules: GateRules::from(config),
            pass_score: config.assessment_pass_score,
        }
    }

    /// Append a 5 C's assessment to an initiated loan
    pub async fn create(
        &self,
        actor: Actor,
        request: CreateAssessmentRequest,
    ) -> Result<CreditAssessment, ApiError> {
        request.validate()?;
        let scores = request.scores()?;

        let mut tx = self.db_pool.begin().await?;

        let loan = store::lock_loan(&mut tx, request.loan_id).await?;
        let snapshot = store::snapshot_of(&mut tx, &loan).await?;
        authorize(&snapshot, &actor, LoanAction::Assess, &self.rules)?;

        let below_threshold_override =
            scores.check_submission(self.pass_score, request.confirm_low_score)?;

        let assessment = sqlx::query_as::<_, CreditAssessment>(
            r#"
            INSERT INTO credit_assessments (
                id, loan_id, officer_id, assessed_by,
                character_score, capacity_score, capital_score, collateral_score, conditions_score,
                total_score, below_threshold_override, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(loan.id)
        .bind(request.officer_id.unwrap_or(actor.user_id))
        .bind(actor.user_id)
        .bind(scores.character)
        .bind(scores.capacity)
        .bind(scores.capital)
        .bind(scores.collateral)
        .bind(scores.conditions)
        .bind(scores.total())
        .bind(below_threshold_override)
        .bind(&request.notes)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, "loan.assess", "loan", loan.id).with_details(
                serde_json::json!({
                    "assessment_id": assessment.id,
                    "total_score": assessment.total_score,
                    "below_threshold_override": below_threshold_override,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        if below_threshold_override {
            tracing::warn!(
                loan_id = %loan.id,
                actor = %actor.user_id,
                total = assessment.total_score,
                pass_score = self.pass_score,
                "Assessment below pass score submitted with confirmation"
            );
        } else {
            tracing::info!(
                loan_id = %loan.id,
                actor = %actor.user_id,
                total = assessment.total_score,
                "Credit assessment recorded"
            );
        }

        Ok(assessment)
    }

    /// Assessment history, newest first
    pub async fn list_for_loan(&self, loan_id: Uuid) -> Result<Vec<CreditAssessment>, ApiError> {
        let mut conn = self.db_pool.acquire().await?;
        store::fetch_loan(&mut conn, loan_id).await?;

        let assessments = sqlx::query_as::<_, CreditAssessment>(
            "SELECT * FROM credit_assessments WHERE loan_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(loan_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(assessments)
    }
}

//! Portfolio analytics

use serde::Serialize;
use sqlx::PgPool;

use crate::error::ApiError;
use crate::workflow::LoanStatus;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StatusSummary {
    pub status: LoanStatus,
    pub count: i64,
    pub principal: i64,
    pub outstanding: i64,
}

#[derive(Debug, Serialize)]
pub struct PortfolioSummary {
    pub by_status: Vec<StatusSummary>,
    pub total_loans: i64,
    pub total_disbursed: i64,
    pub total_outstanding: i64,
    pub total_repaid: i64,
    pub clients: i64,
    pub active_groups: i64,
    pub savings_held: i64,
}

#[derive(Clone)]
pub struct AnalyticsService {
    db_pool: PgPool,
}

impl AnalyticsService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn portfolio(&self) -> Result<PortfolioSummary, ApiError> {
        let by_status = sqlx::query_as::<_, StatusSummary>(
            r#"
            SELECT status,
                   COUNT(*)::BIGINT AS count,
                   COALESCE(SUM(principal), 0)::BIGINT AS principal,
                   COALESCE(SUM(outstanding_balance), 0)::BIGINT AS outstanding
            FROM loans
            GROUP BY status
            ORDER BY status
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        let (total_repaid,): (i64,) =
            sqlx::query_as("SELECT COALESCE(SUM(amount), 0)::BIGINT FROM repayments")
                .fetch_one(&self.db_pool)
                .await?;

        let (clients, savings_held): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*)::BIGINT, COALESCE(SUM(savings_balance), 0)::BIGINT FROM clients",
        )
        .fetch_one(&self.db_pool)
        .await?;

        let (active_groups,): (i64,) =
            sqlx::query_as("SELECT COUNT(*)::BIGINT FROM groups WHERE status = 'active'")
                .fetch_one(&self.db_pool)
                .await?;

        Ok(summarize(by_status, total_repaid, clients, active_groups, savings_held))
    }
}

fn summarize(
    by_status: Vec<StatusSummary>,
    total_repaid: i64,
    clients: i64,
    active_groups: i64,
    savings_held: i64,
) -> PortfolioSummary {
    let total_loans = by_status.iter().map(|s| s.count).sum();
    let total_outstanding = by_status.iter().map(|s| s.outstanding).sum();
    let total_disbursed = by_status
        .iter()
        .filter(|s| {
            matches!(
                s.status,
                LoanStatus::Disbursed | LoanStatus::Repaid | LoanStatus::Defaulted
            )
        })
        .map(|s| s.principal)
        .sum();

    PortfolioSummary {
        by_status,
        total_loans,
        total_disbursed,
        total_outstanding,
        total_repaid,
        clients,
        active_groups,
        savings_held,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: LoanStatus, count: i64, principal: i64, outstanding: i64) -> StatusSummary {
        StatusSummary {
            status,
            count,
            principal,
            outstanding,
        }
    }

    #[test]
    fn test_disbursed_total_counts_loans_that_left_the_book() {
        let summary = summarize(
            vec![
                row(LoanStatus::Initiated, 2, 50_000, 0),
                row(LoanStatus::Disbursed, 1, 100_000, 80_000),
                row(LoanStatus::Repaid, 1, 40_000, 0),
                row(LoanStatus::Rejected, 1, 10_000, 0),
            ],
            66_000,
            4,
            1,
            12_000,
        );

        assert_eq!(summary.total_loans, 5);
        assert_eq!(summary.total_disbursed, 140_000);
        assert_eq!(summary.total_outstanding, 80_000);
        assert_eq!(summary.total_repaid, 66_000);
    }
}

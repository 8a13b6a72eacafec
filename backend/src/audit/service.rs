use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::model::{AuditEntry, AuditQuery, NewAuditEntry};
use crate::error::ApiError;
use crate::models::PaginatedResponse;

/// Append an audit entry on an open connection or transaction
pub async fn record(conn: &mut PgConnection, entry: NewAuditEntry) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, actor_id, actor_role, action, entity_type, entity_id, details)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.actor.user_id)
    .bind(entry.actor.role)
    .bind(&entry.action)
    .bind(entry.entity_type)
    .bind(entry.entity_id)
    .bind(&entry.details)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(
        actor = %entry.actor.user_id,
        action = %entry.action,
        entity = entry.entity_type,
        entity_id = %entry.entity_id,
        "Audit entry recorded"
    );

    Ok(())
}

#[derive(Clone)]
pub struct AuditService {
    db_pool: PgPool,
}

impl AuditService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn list(&self, query: AuditQuery) -> Result<PaginatedResponse<AuditEntry>, ApiError> {
        let (page, limit, offset) = query.pagination().resolve();

        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM audit_logs WHERE 1=1");
        push_filters(&mut count, &query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db_pool).await?;

        let mut select: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM audit_logs WHERE 1=1");
        push_filters(&mut select, &query);
        select.push(" ORDER BY created_at DESC LIMIT ");
        select.push_bind(limit);
        select.push(" OFFSET ");
        select.push_bind(offset);

        let data = select
            .build_query_as::<AuditEntry>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse {
            data,
            total,
            page,
            limit,
        })
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &AuditQuery) {
    if let Some(entity_type) = &query.entity_type {
        builder.push(" AND entity_type = ");
        builder.push_bind(entity_type.clone());
    }
    if let Some(entity_id) = query.entity_id {
        builder.push(" AND entity_id = ");
        builder.push_bind(entity_id);
    }
    if let Some(actor_id) = query.actor_id {
        builder.push(" AND actor_id = ");
        builder.push_bind(actor_id);
    }
}

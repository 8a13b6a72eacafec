use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::model::{Client, ClientQuery, CreateClientRequest};
use crate::audit::{self, NewAuditEntry};
use crate::error::ApiError;
use crate::models::PaginatedResponse;
use crate::workflow::{Actor, Permission, Policy};

#[derive(Clone)]
pub struct ClientService {
    db_pool: PgPool,
}

impl ClientService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn create(&self, actor: Actor, request: CreateClientRequest) -> Result<Client, ApiError> {
        Policy::require(actor.role, Permission::ManageClients)?;
        request.validate()?;

        let mut tx = self.db_pool.begin().await?;

        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (id, full_name, national_id, phone, branch, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.full_name.trim())
        .bind(request.national_id.trim())
        .bind(&request.phone)
        .bind(&request.branch)
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::Conflict(format!(
                "A client with national ID {} already exists",
                request.national_id.trim()
            )),
            other => other,
        })?;

        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, "client.create", "client", client.id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(client_id = %client.id, actor = %actor.user_id, "Client registered");

        Ok(client)
    }

    pub async fn list(&self, query: ClientQuery) -> Result<PaginatedResponse<Client>, ApiError> {
        let (page, limit, offset) = query.pagination().resolve();

        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*)::BIGINT FROM clients WHERE 1=1");
        push_filters(&mut count, &query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db_pool).await?;

        let mut select: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM clients WHERE 1=1");
        push_filters(&mut select, &query);
        select.push(" ORDER BY full_name, id LIMIT ");
        select.push_bind(limit);
        select.push(" OFFSET ");
        select.push_bind(offset);

        let data = select
            .build_query_as::<Client>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse {
            data,
            total,
            page,
            limit,
        })
    }

    pub async fn get(&self, client_id: Uuid) -> Result<Client, ApiError> {
        sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(client_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Client {} not found", client_id)))
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ClientQuery) {
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q);
        builder.push(" AND (full_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR national_id ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if let Some(branch) = &query.branch {
        builder.push(" AND branch = ");
        builder.push_bind(branch.clone());
    }
}

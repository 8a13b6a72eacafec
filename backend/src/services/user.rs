//! Staff user management

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::audit::{self, NewAuditEntry};
use crate::auth::hash_password;
use crate::error::ApiError;
use crate::models::{
    CreateUserRequest, PaginatedResponse, PaginationParams, User, UserResponse, UserRole,
};
use crate::workflow::{Actor, Permission, Policy};

#[derive(Clone)]
pub struct UserService {
    db_pool: PgPool,
}

impl UserService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn create(&self, actor: Actor, request: CreateUserRequest) -> Result<UserResponse, ApiError> {
        Policy::require(actor.role, Permission::ManageUsers)?;
        request.validate()?;

        let email = request.email.trim().to_lowercase();
        let password_hash = hash_password(&request.password)?;

        let mut tx = self.db_pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, password_hash, role, branch)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(request.name.trim())
        .bind(&password_hash)
        .bind(request.role)
        .bind(&request.branch)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => {
                ApiError::Conflict(format!("A user with email {} already exists", email))
            }
            other => other,
        })?;

        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, "user.create", "user", user.id)
                .with_details(serde_json::json!({ "role": user.role })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user.id, role = %user.role, actor = %actor.user_id, "Staff user created");

        Ok(user.into())
    }

    /// Create the first super admin when no users exist yet. Returns whether
    /// a user was created.
    pub async fn ensure_bootstrap_admin(&self, email: &str, password: &str) -> Result<bool, ApiError> {
        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*)::BIGINT FROM users")
            .fetch_one(&self.db_pool)
            .await?;
        if existing > 0 {
            return Ok(false);
        }

        let password_hash = hash_password(password)?;
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, role)
            VALUES ($1, $2, 'Administrator', $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email.trim().to_lowercase())
        .bind(&password_hash)
        .bind(UserRole::SuperAdmin)
        .execute(&self.db_pool)
        .await?;

        tracing::info!(email = %email.trim(), "Bootstrap super admin created");
        Ok(true)
    }

    pub async fn list(
        &self,
        actor: Actor,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<UserResponse>, ApiError> {
        Policy::require(actor.role, Permission::ManageUsers)?;

        let (page, limit, offset) = pagination.resolve();

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*)::BIGINT FROM users")
            .fetch_one(&self.db_pool)
            .await?;

        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC, id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(PaginatedResponse {
            data: users.into_iter().map(UserResponse::from).collect(),
            total,
            page,
            limit,
        })
    }

    /// Deactivate a user and revoke every session they hold
    pub async fn deactivate(&self, actor: Actor, user_id: Uuid) -> Result<(), ApiError> {
        Policy::require(actor.role, Permission::ManageUsers)?;

        if actor.user_id == user_id {
            return Err(ApiError::Forbidden(
                "You cannot deactivate your own account".to_string(),
            ));
        }

        let mut tx = self.db_pool.begin().await?;
        let now = Utc::now();

        let updated = sqlx::query("UPDATE users SET active = FALSE, updated_at = $1 WHERE id = $2")
            .bind(now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!("User {} not found", user_id)));
        }

        let revoked = sqlx::query(
            r#"
            UPDATE auth_sessions
            SET revoked = TRUE, revoked_at = $1, updated_at = $1
            WHERE user_id = $2 AND revoked = FALSE
            "#,
        )
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, "user.deactivate", "user", user_id)
                .with_details(serde_json::json!({ "revoked_sessions": revoked.rows_affected() })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user_id, actor = %actor.user_id, "Staff user deactivated");

        Ok(())
    }
}

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::model::{CreateGroupRequest, Group, GroupDetail, GroupMember, GroupStatus, Signatories};
use crate::audit::{self, NewAuditEntry};
use crate::error::ApiError;
use crate::workflow::{Actor, Permission, Policy};

#[derive(Clone)]
pub struct GroupService {
    db_pool: PgPool,
}

impl GroupService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Create a pending group with its initial members
    pub async fn create(&self, actor: Actor, request: CreateGroupRequest) -> Result<GroupDetail, ApiError> {
        Policy::require(actor.role, Permission::ManageGroups)?;
        request.validate()?;

        let mut member_ids = request.member_ids.clone();
        member_ids.sort();
        member_ids.dedup();

        let mut tx = self.db_pool.begin().await?;

        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (id, name, branch, status, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.name.trim())
        .bind(&request.branch)
        .bind(GroupStatus::Pending)
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await?;

        for client_id in &member_ids {
            sqlx::query("INSERT INTO group_members (group_id, client_id) VALUES ($1, $2)")
                .bind(group.id)
                .bind(client_id)
                .execute(&mut *tx)
                .await?;
        }

        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, "group.create", "group", group.id)
                .with_details(serde_json::json!({ "members": member_ids.len() })),
        )
        .await?;

        let members = members_of(&mut tx, group.id).await?;
        tx.commit().await?;

        tracing::info!(group_id = %group.id, actor = %actor.user_id, "Group created");

        Ok(GroupDetail { group, members })
    }

    pub async fn get(&self, group_id: Uuid) -> Result<GroupDetail, ApiError> {
        let mut conn = self.db_pool.acquire().await?;

        let group = sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1")
            .bind(group_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| not_found(group_id))?;
        let members = members_of(&mut conn, group_id).await?;

        Ok(GroupDetail { group, members })
    }

    /// Assign chairperson, secretary and treasurer
    pub async fn set_signatories(
        &self,
        actor: Actor,
        group_id: Uuid,
        signatories: Signatories,
    ) -> Result<GroupDetail, ApiError> {
        Policy::require(actor.role, Permission::ManageGroups)?;

        let mut tx = self.db_pool.begin().await?;

        let group = lock_group(&mut tx, group_id).await?;
        let members = members_of(&mut tx, group_id).await?;
        let member_ids: Vec<Uuid> = members.iter().map(|m| m.client_id).collect();
        signatories.validate(&member_ids, group.status)?;

        let group = sqlx::query_as::<_, Group>(
            r#"
            UPDATE groups
            SET chairperson_id = $1, secretary_id = $2, treasurer_id = $3, updated_at = $4
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(signatories.chairperson_id)
        .bind(signatories.secretary_id)
        .bind(signatories.treasurer_id)
        .bind(Utc::now())
        .bind(group.id)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, "group.set_signatories", "group", group.id)
                .with_details(serde_json::to_value(signatories)?),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(group_id = %group.id, actor = %actor.user_id, "Group signatories updated");

        Ok(GroupDetail { group, members })
    }

    /// Change group status; activation re-validates the signatories
    pub async fn set_status(
        &self,
        actor: Actor,
        group_id: Uuid,
        status: GroupStatus,
    ) -> Result<GroupDetail, ApiError> {
        Policy::require(actor.role, Permission::ManageGroups)?;

        let mut tx = self.db_pool.begin().await?;

        let group = lock_group(&mut tx, group_id).await?;
        let members = members_of(&mut tx, group_id).await?;
        let member_ids: Vec<Uuid> = members.iter().map(|m| m.client_id).collect();
        group.signatories().validate(&member_ids, status)?;

        let previous = group.status;
        let group = sqlx::query_as::<_, Group>(
            "UPDATE groups SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(status)
        .bind(Utc::now())
        .bind(group.id)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut tx,
            NewAuditEntry::new(actor, "group.set_status", "group", group.id)
                .with_details(serde_json::json!({ "from": previous, "to": status })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            group_id = %group.id,
            actor = %actor.user_id,
            from = %previous,
            to = %status,
            "Group status changed"
        );

        Ok(GroupDetail { group, members })
    }
}

fn not_found(group_id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Group {} not found", group_id))
}

async fn lock_group(conn: &mut PgConnection, group_id: Uuid) -> Result<Group, ApiError> {
    sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1 FOR UPDATE")
        .bind(group_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found(group_id))
}

async fn members_of(conn: &mut PgConnection, group_id: Uuid) -> Result<Vec<GroupMember>, ApiError> {
    let members = sqlx::query_as::<_, GroupMember>(
        r#"
        SELECT c.id AS client_id, c.full_name, c.national_id, gm.joined_at
        FROM group_members gm
        JOIN clients c ON c.id = gm.client_id
        WHERE gm.group_id = $1
        ORDER BY gm.joined_at, c.full_name
        "#,
    )
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(members)
}

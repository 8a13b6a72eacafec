use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{PaginationParams, UserRole};
use crate::workflow::Actor;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub actor_role: UserRole,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub actor: Actor,
    pub action: String,
    pub entity_type: &'static str,
    pub entity_id: Uuid,
    pub details: serde_json::Value,
}

impl NewAuditEntry {
    pub fn new(
        actor: Actor,
        action: impl Into<String>,
        entity_type: &'static str,
        entity_id: Uuid,
    ) -> Self {
        Self {
            actor,
            action: action.into(),
            entity_type,
            entity_id,
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AuditQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl AuditQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

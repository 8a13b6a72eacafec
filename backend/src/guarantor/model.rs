use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Guarantor decision status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "guarantor_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GuarantorStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Guarantor {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub name: String,
    pub national_id: String,
    pub phone: Option<String>,
    pub relationship: Option<String>,
    pub id_document_url: Option<String>,
    pub photo_url: Option<String>,
    pub status: GuarantorStatus,
    pub added_by: Uuid,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Guarantor details supplied on loan initiation or added later
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct GuarantorInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub national_id: String,
    pub phone: Option<String>,
    pub relationship: Option<String>,
    #[validate(url(message = "id_document_url must be a URL"))]
    pub id_document_url: Option<String>,
    #[validate(url(message = "photo_url must be a URL"))]
    pub photo_url: Option<String>,
}

impl GuarantorInput {
    /// Name and national ID are both present
    pub fn is_identified(&self) -> bool {
        !self.name.trim().is_empty() && !self.national_id.trim().is_empty()
    }

    pub fn has_documents(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.id_document_url) && present(&self.photo_url)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddGuarantorRequest {
    pub loan_id: Uuid,
    #[serde(flatten)]
    #[validate]
    pub guarantor: GuarantorInput,
}

/// Accept or reject a guarantor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuarantorDecision {
    Accept,
    Reject,
}

impl GuarantorDecision {
    pub fn status(&self) -> GuarantorStatus {
        match self {
            GuarantorDecision::Accept => GuarantorStatus::Accepted,
            GuarantorDecision::Reject => GuarantorStatus::Rejected,
        }
    }

    pub fn audit_action(&self) -> &'static str {
        match self {
            GuarantorDecision::Accept => "guarantor.accept",
            GuarantorDecision::Reject => "guarantor.reject",
        }
    }
}

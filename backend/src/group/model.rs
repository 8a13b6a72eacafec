use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::workflow::WorkflowError;

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "group_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    Pending,
    Active,
    Inactive,
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GroupStatus::Pending => "pending",
            GroupStatus::Active => "active",
            GroupStatus::Inactive => "inactive",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub branch: Option<String>,
    pub status: GroupStatus,
    pub chairperson_id: Option<Uuid>,
    pub secretary_id: Option<Uuid>,
    pub treasurer_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn signatories(&self) -> Signatories {
        Signatories {
            chairperson_id: self.chairperson_id,
            secretary_id: self.secretary_id,
            treasurer_id: self.treasurer_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct GroupMember {
    pub client_id: Uuid,
    pub full_name: String,
    pub national_id: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<GroupMember>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    pub branch: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

/// Chairperson, secretary and treasurer
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signatories {
    pub chairperson_id: Option<Uuid>,
    pub secretary_id: Option<Uuid>,
    pub treasurer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SetGroupStatusRequest {
    pub status: GroupStatus,
}

impl Signatories {
    fn named(&self) -> [(&'static str, Option<Uuid>); 3] {
        [
            ("chairperson", self.chairperson_id),
            ("secretary", self.secretary_id),
            ("treasurer", self.treasurer_id),
        ]
    }

    /// Check the signatories against the group's members for the given status.
    ///
    /// Assigned signatories must be distinct members. An active group must
    /// have all three assigned.
    pub fn validate(&self, members: &[Uuid], status: GroupStatus) -> Result<(), WorkflowError> {
        let named = self.named();

        if status == GroupStatus::Active {
            if let Some((role, _)) = named.iter().find(|(_, id)| id.is_none()) {
                return Err(WorkflowError::Invalid(format!(
                    "An active group must have a {}",
                    role
                )));
            }
        }

        for (i, (role, id)) in named.iter().enumerate() {
            let Some(id) = id else { continue };

            if !members.contains(id) {
                return Err(WorkflowError::Invalid(format!(
                    "The {} must be a member of the group",
                    role
                )));
            }

            if let Some((other, _)) = named[i + 1..].iter().find(|(_, o)| *o == Some(*id)) {
                return Err(WorkflowError::Invalid(format!(
                    "The {} and {} must be different members",
                    role, other
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> Vec<Uuid> {
        (0..4).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_distinct_members_pass() {
        let m = members();
        let s = Signatories {
            chairperson_id: Some(m[0]),
            secretary_id: Some(m[1]),
            treasurer_id: Some(m[2]),
        };
        assert!(s.validate(&m, GroupStatus::Active).is_ok());
    }

    #[test]
    fn test_duplicate_signatory_refused() {
        let m = members();
        let s = Signatories {
            chairperson_id: Some(m[0]),
            secretary_id: Some(m[1]),
            treasurer_id: Some(m[0]),
        };
        let err = s.validate(&m, GroupStatus::Pending).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The chairperson and treasurer must be different members"
        );
    }

    #[test]
    fn test_active_group_needs_all_three() {
        let m = members();
        let s = Signatories {
            chairperson_id: Some(m[0]),
            secretary_id: Some(m[1]),
            treasurer_id: None,
        };
        assert!(s.validate(&m, GroupStatus::Pending).is_ok());
        assert!(s.validate(&m, GroupStatus::Active).is_err());
        assert!(Signatories::default().validate(&m, GroupStatus::Active).is_err());
    }

    #[test]
    fn test_signatory_must_be_member() {
        let m = members();
        let s = Signatories {
            chairperson_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let err = s.validate(&m, GroupStatus::Pending).unwrap_err();
        assert!(err.to_string().contains("chairperson"));
    }
}

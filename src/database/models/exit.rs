use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::double_option;
use crate::types::{AuditAction, ExitStatus, ExitType, MemberStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exit {
    pub id: Uuid,
    pub member_id: Uuid,
    pub exit_type: ExitType,
    pub exit_date: NaiveDate,
    pub reason: Option<String>,
    pub destination_church: Option<String>,
    pub status: ExitStatus,
    pub previous_status: MemberStatus,
    pub recorded_by: Option<Uuid>,
    pub reinstated_at: Option<DateTime<Utc>>,
    pub reinstated_by: Option<Uuid>,
    pub reinstatement_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewExit {
    pub member_id: Uuid,
    pub exit_type: ExitType,
    pub exit_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub destination_church: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExitPatch {
    pub exit_type: Option<ExitType>,
    pub exit_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub reason: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub destination_church: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reinstatement {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExitQuery {
    pub status: Option<ExitStatus>,
    pub exit_type: Option<ExitType>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExitAudit {
    pub id: Uuid,
    pub exit_id: Option<Uuid>,
    pub member_id: Uuid,
    pub action: AuditAction,
    pub before_state: Value,
    pub after_state: Value,
    pub performed_by: Option<Uuid>,
    pub performed_at: DateTime<Utc>,
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::double_option;
use crate::types::CellRole;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CellGroup {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub meeting_day: Option<String>,
    pub meeting_time: Option<String>,
    pub location: Option<String>,
    pub leader_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CellGroupSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub group: CellGroup,
    pub leader_name: Option<String>,
    pub member_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCellGroup {
    pub name: String,
    pub description: Option<String>,
    pub meeting_day: Option<String>,
    pub meeting_time: Option<String>,
    pub location: Option<String>,
    pub leader_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CellGroupPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub meeting_day: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub meeting_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    /// `null` removes the current leader
    #[serde(default, deserialize_with = "double_option")]
    pub leader_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CellMember {
    pub id: Uuid,
    pub cell_group_id: Uuid,
    pub member_id: Uuid,
    pub role: CellRole,
    pub is_active: bool,
    pub joined_on: NaiveDate,
    pub left_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CellMemberDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub membership: CellMember,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddCellMember {
    pub member_id: Uuid,
    pub role: Option<CellRole>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CellGroupQuery {
    #[serde(default)]
    pub active_only: bool,
}

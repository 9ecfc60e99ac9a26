use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::LeadershipRole;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeadershipRoleRecord {
    pub id: Uuid,
    pub member_id: Uuid,
    pub role: LeadershipRole,
    pub is_active: bool,
    pub granted_on: NaiveDate,
    pub revoked_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrantRole {
    pub role: LeadershipRole,
    pub notes: Option<String>,
}

/// A member holding at least one active leadership role
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Leader {
    pub member_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
    pub leads_cell_id: Option<Uuid>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::double_option;
use crate::types::PrayerStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrayerRequest {
    pub id: Uuid,
    pub member_id: Option<Uuid>,
    pub title: String,
    pub body: Option<String>,
    pub is_confidential: bool,
    pub status: PrayerStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPrayerRequest {
    pub member_id: Option<Uuid>,
    pub title: String,
    pub body: Option<String>,
    #[serde(default)]
    pub is_confidential: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrayerPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub body: Option<Option<String>>,
    pub is_confidential: Option<bool>,
    pub status: Option<PrayerStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrayerQuery {
    pub status: Option<PrayerStatus>,
}

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::double_option;
use crate::types::GivingMethod;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Gift {
    pub id: Uuid,
    pub member_id: Option<Uuid>,
    pub amount: Decimal,
    pub fund: String,
    pub method: GivingMethod,
    pub given_on: NaiveDate,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGift {
    /// Absent for anonymous gifts
    pub member_id: Option<Uuid>,
    pub amount: Decimal,
    pub fund: String,
    pub method: Option<GivingMethod>,
    pub given_on: Option<NaiveDate>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GiftPatch {
    pub amount: Option<Decimal>,
    pub fund: Option<String>,
    pub method: Option<GivingMethod>,
    pub given_on: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub reference: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GivingQuery {
    pub member_id: Option<Uuid>,
    pub fund: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FundTotal {
    pub fund: String,
    pub total: Decimal,
    pub gifts: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GivingSummary {
    pub member_id: Uuid,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub total: Decimal,
    pub gifts: i64,
    pub funds: Vec<FundTotal>,
}

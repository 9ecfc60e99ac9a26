// handlers/protected/prayer.rs - Prayer requests

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::prayer::{NewPrayerRequest, PrayerPatch, PrayerQuery, PrayerRequest};
use crate::middleware::{ApiResponse, ApiResult, TenantPool, ValidatedUser};
use crate::services::PrayerService;
use crate::types::AccessLevel;

/// GET /api/prayer-requests?status=
pub async fn prayer_list(
    Query(query): Query<PrayerQuery>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Vec<PrayerRequest>> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(PrayerService::new(pool).list(query, &user.actor()).await?))
}

/// POST /api/prayer-requests
pub async fn prayer_create(
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<NewPrayerRequest>,
) -> ApiResult<PrayerRequest> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::created(PrayerService::new(pool).create(body, &user.actor()).await?))
}

/// GET /api/prayer-requests/:id
pub async fn prayer_get(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<PrayerRequest> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(PrayerService::new(pool).get(id, &user.actor()).await?))
}

/// PATCH /api/prayer-requests/:id
pub async fn prayer_update(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<PrayerPatch>,
) -> ApiResult<PrayerRequest> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::success(PrayerService::new(pool).update(id, body, &user.actor()).await?))
}

/// DELETE /api/prayer-requests/:id
pub async fn prayer_delete(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<PrayerRequest> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::success(PrayerService::new(pool).delete(id, &user.actor()).await?))
}

// handlers/protected/giving.rs - Giving log

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::giving::{Gift, GiftPatch, GivingQuery, NewGift};
use crate::database::models::Page;
use crate::middleware::{ApiResponse, ApiResult, TenantPool, ValidatedUser};
use crate::services::GivingService;
use crate::types::AccessLevel;

/// GET /api/giving?member_id=&fund=&from=&to=&limit=&offset=
pub async fn gifts_list(
    Query(query): Query<GivingQuery>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Page<Gift>> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(GivingService::new(pool).list(query).await?))
}

/// POST /api/giving
pub async fn gift_create(
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<NewGift>,
) -> ApiResult<Gift> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::created(GivingService::new(pool).record(body, &user.actor()).await?))
}

/// GET /api/giving/:id
pub async fn gift_get(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Gift> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(GivingService::new(pool).get(id).await?))
}

/// PATCH /api/giving/:id
pub async fn gift_update(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<GiftPatch>,
) -> ApiResult<Gift> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::success(GivingService::new(pool).update(id, body).await?))
}

/// DELETE /api/giving/:id
pub async fn gift_delete(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Gift> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::success(GivingService::new(pool).delete(id).await?))
}

// handlers/protected/exits.rs - Member exits and reinstatement

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::exit::{Exit, ExitPatch, ExitQuery, NewExit, Reinstatement};
use crate::middleware::{ApiResponse, ApiResult, TenantPool, ValidatedUser};
use crate::services::ExitService;
use crate::types::AccessLevel;

/// GET /api/exits?status=&exit_type=
pub async fn exits_list(
    Query(query): Query<ExitQuery>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Vec<Exit>> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(ExitService::new(pool).list_exits(query).await?))
}

/// POST /api/exits - Record an exit; the member becomes inactive
pub async fn exit_create(
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<NewExit>,
) -> ApiResult<Exit> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::created(ExitService::new(pool).record_exit(body, &user.actor()).await?))
}

/// GET /api/exits/:id
pub async fn exit_get(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Exit> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(ExitService::new(pool).get_exit(id).await?))
}

/// PATCH /api/exits/:id
pub async fn exit_update(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<ExitPatch>,
) -> ApiResult<Exit> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::success(ExitService::new(pool).update_exit(id, body, &user.actor()).await?))
}

/// POST /api/exits/:id/reinstate - Body is optional: `{"notes": "..."}`
pub async fn exit_reinstate(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    body: Option<Json<Reinstatement>>,
) -> ApiResult<Exit> {
    user.require(AccessLevel::Full)?;
    let Json(input) = body.unwrap_or_default();
    Ok(ApiResponse::success(ExitService::new(pool).reinstate(id, input, &user.actor()).await?))
}

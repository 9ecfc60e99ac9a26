// handlers/protected/members.rs - Member records

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::exit::{Exit, ExitAudit};
use crate::database::models::giving::{DateRange, GivingSummary};
use crate::database::models::member::{Member, MemberPatch, MemberQuery, NewMember};
use crate::database::models::Page;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult, TenantPool, ValidatedUser};
use crate::services::{ExitService, GivingService, MemberService};
use crate::types::AccessLevel;

/// GET /api/members?status=&search=&cell_group_id=&limit=&offset=
pub async fn members_list(
    Query(query): Query<MemberQuery>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Page<Member>> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(MemberService::new(pool).list(query).await?))
}

/// POST /api/members
pub async fn member_create(
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<NewMember>,
) -> ApiResult<Member> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::created(MemberService::new(pool).create(body).await?))
}

/// POST /api/members/find - Filtered search with the JSON filter language
pub async fn members_find(
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(filter): Json<FilterData>,
) -> ApiResult<Page<Member>> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(MemberService::new(pool).find(filter).await?))
}

/// GET /api/members/:id
pub async fn member_get(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Member> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(MemberService::new(pool).get(id).await?))
}

/// PATCH /api/members/:id
pub async fn member_update(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<MemberPatch>,
) -> ApiResult<Member> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::success(MemberService::new(pool).update(id, body).await?))
}

/// DELETE /api/members/:id
pub async fn member_delete(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Member> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::success(MemberService::new(pool).delete(id).await?))
}

/// GET /api/members/:id/exits
pub async fn member_exits(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Vec<Exit>> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(ExitService::new(pool).list_member_exits(id).await?))
}

/// GET /api/members/:id/audit - Exit and reinstatement history
pub async fn member_audit(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Vec<ExitAudit>> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(ExitService::new(pool).member_audit(id).await?))
}

/// GET /api/members/:id/giving/summary?from=&to=
pub async fn member_giving_summary(
    Path(id): Path<Uuid>,
    Query(range): Query<DateRange>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<GivingSummary> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(GivingService::new(pool).member_summary(id, range).await?))
}

// handlers/protected/cell_groups.rs - Cell groups and their memberships

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::cell_group::{
    AddCellMember, CellGroup, CellGroupPatch, CellGroupQuery, CellGroupSummary, CellMember, CellMemberDetail,
    NewCellGroup,
};
use crate::middleware::{ApiResponse, ApiResult, TenantPool, ValidatedUser};
use crate::services::CellGroupService;
use crate::types::AccessLevel;

/// GET /api/cell-groups?active_only=
pub async fn cell_groups_list(
    Query(query): Query<CellGroupQuery>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Vec<CellGroupSummary>> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(CellGroupService::new(pool).list(query).await?))
}

/// POST /api/cell-groups
pub async fn cell_group_create(
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<NewCellGroup>,
) -> ApiResult<CellGroup> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::created(CellGroupService::new(pool).create(body).await?))
}

/// GET /api/cell-groups/:id
pub async fn cell_group_get(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<CellGroupSummary> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(CellGroupService::new(pool).get(id).await?))
}

/// PATCH /api/cell-groups/:id - `"leader_id": null` removes the leader
pub async fn cell_group_update(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<CellGroupPatch>,
) -> ApiResult<CellGroup> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::success(CellGroupService::new(pool).update(id, body).await?))
}

/// DELETE /api/cell-groups/:id
pub async fn cell_group_delete(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<CellGroup> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::success(CellGroupService::new(pool).delete(id).await?))
}

/// GET /api/cell-groups/:id/members
pub async fn cell_members_list(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Vec<CellMemberDetail>> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(CellGroupService::new(pool).list_members(id).await?))
}

/// POST /api/cell-groups/:id/members
pub async fn cell_member_add(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<AddCellMember>,
) -> ApiResult<CellMember> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::created(CellGroupService::new(pool).add_member(id, body).await?))
}

/// DELETE /api/cell-groups/:id/members/:member_id
pub async fn cell_member_remove(
    Path((id, member_id)): Path<(Uuid, Uuid)>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<CellMember> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::success(CellGroupService::new(pool).remove_member(id, member_id).await?))
}

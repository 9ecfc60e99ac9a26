// handlers/protected/leadership.rs - Leadership roles

use axum::{extract::Path, Extension, Json};
use uuid::Uuid;

use crate::database::models::leadership::{GrantRole, Leader, LeadershipRoleRecord};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantPool, ValidatedUser};
use crate::services::LeadershipService;
use crate::types::{AccessLevel, LeadershipRole};

/// GET /api/members/:id/roles
pub async fn roles_list(
    Path(member_id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Vec<LeadershipRoleRecord>> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(LeadershipService::new(pool).list_roles(member_id).await?))
}

/// POST /api/members/:id/roles
pub async fn role_grant(
    Path(member_id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<GrantRole>,
) -> ApiResult<LeadershipRoleRecord> {
    user.require(AccessLevel::Edit)?;
    Ok(ApiResponse::created(LeadershipService::new(pool).grant(member_id, body).await?))
}

/// DELETE /api/members/:id/roles/:role
pub async fn role_revoke(
    Path((member_id, role)): Path<(Uuid, String)>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<LeadershipRoleRecord> {
    user.require(AccessLevel::Edit)?;
    let role = role
        .parse::<LeadershipRole>()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(ApiResponse::success(LeadershipService::new(pool).revoke(member_id, role).await?))
}

/// GET /api/leaders
pub async fn leaders_list(
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Vec<Leader>> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(LeadershipService::new(pool).list_leaders().await?))
}

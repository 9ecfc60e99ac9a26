// handlers/protected/users.rs - User accounts within the tenant (full access)

use axum::{extract::Path, Extension, Json};
use uuid::Uuid;

use crate::database::models::user::{NewUser, User, UserPatch};
use crate::middleware::{ApiResponse, ApiResult, TenantPool, ValidatedUser};
use crate::services::UserService;
use crate::types::AccessLevel;

/// GET /api/users
pub async fn users_list(
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<Vec<User>> {
    user.require(AccessLevel::Full)?;
    Ok(ApiResponse::success(UserService::new(pool).list().await?))
}

/// POST /api/users
pub async fn user_create(
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<NewUser>,
) -> ApiResult<User> {
    user.require(AccessLevel::Full)?;
    Ok(ApiResponse::created(UserService::new(pool).create(body).await?))
}

/// PATCH /api/users/:id
pub async fn user_update(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<UserPatch>,
) -> ApiResult<User> {
    user.require(AccessLevel::Full)?;
    Ok(ApiResponse::success(UserService::new(pool).update(id, body, &user.actor()).await?))
}

/// DELETE /api/users/:id - Soft delete; users cannot delete themselves
pub async fn user_delete(
    Path(id): Path<Uuid>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> ApiResult<User> {
    user.require(AccessLevel::Full)?;
    Ok(ApiResponse::success(UserService::new(pool).delete(id, &user.actor()).await?))
}

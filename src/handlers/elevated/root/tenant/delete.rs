// handlers/elevated/root/tenant/delete.rs - DELETE /api/root/tenants/:name

use axum::{extract::Path, Extension};
use tracing::warn;

use crate::database::models::tenant::Tenant;
use crate::middleware::{ApiResponse, ApiResult, ValidatedTenant, ValidatedUser};
use crate::services::TenantService;
use crate::error::ApiError;

/// Soft delete. The database is kept so the tenant can be restored.
pub async fn tenant_delete(
    Path(name): Path<String>,
    Extension(current): Extension<ValidatedTenant>,
    Extension(user): Extension<ValidatedUser>,
) -> ApiResult<Tenant> {
    if current.name == name {
        return Err(ApiError::bad_request("Cannot trash the tenant of the current session"));
    }
    let tenant = TenantService::new().await?.delete_tenant(&name).await?;
    warn!("Tenant {} trashed by {}", tenant.name, user.auth);
    Ok(ApiResponse::success(tenant))
}

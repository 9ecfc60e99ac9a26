// handlers/elevated/root/tenant/restore.rs - POST /api/root/tenants/:name/restore

use axum::extract::Path;

use crate::database::models::tenant::Tenant;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::TenantService;

pub async fn tenant_restore(Path(name): Path<String>) -> ApiResult<Tenant> {
    Ok(ApiResponse::success(TenantService::new().await?.restore_tenant(&name).await?))
}

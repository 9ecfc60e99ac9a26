// handlers/elevated/root/tenant/show.rs - GET /api/root/tenants/:name

use axum::extract::Path;

use crate::database::models::tenant::Tenant;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::TenantService;

pub async fn tenant_show(Path(name): Path<String>) -> ApiResult<Tenant> {
    Ok(ApiResponse::success(TenantService::new().await?.get_tenant(&name).await?))
}

// handlers/elevated/root/tenant/create.rs - POST /api/root/tenants

use axum::{Extension, Json};
use tracing::info;

use crate::database::models::tenant::{NewTenant, Tenant};
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::TenantService;

/// Provision a tenant: registry row, dedicated database, schema and a `full` admin user.
///
/// Input:
/// ```json
/// { "name": "grace-chapel", "display_name": "Grace Chapel",
///   "admin_auth": "pastor.j", "admin_password": "..." }
/// ```
pub async fn tenant_create(
    Extension(user): Extension<ValidatedUser>,
    Json(body): Json<NewTenant>,
) -> ApiResult<Tenant> {
    let tenant = TenantService::new().await?.create_tenant(body).await?;
    info!("Tenant {} created by {}", tenant.name, user.auth);
    Ok(ApiResponse::created(tenant))
}

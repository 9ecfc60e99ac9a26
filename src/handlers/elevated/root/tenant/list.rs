// handlers/elevated/root/tenant/list.rs - GET /api/root/tenants

use axum::extract::Query;
use serde::Deserialize;

use crate::database::models::tenant::Tenant;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::TenantService;

#[derive(Debug, Default, Deserialize)]
pub struct TenantListQuery {
    #[serde(default)]
    pub include_trashed: bool,
}

pub async fn tenant_list(Query(query): Query<TenantListQuery>) -> ApiResult<Vec<Tenant>> {
    let tenants = TenantService::new().await?.list_tenants(query.include_trashed).await?;
    Ok(ApiResponse::success(tenants))
}

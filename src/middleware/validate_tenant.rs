use axum::{extract::Request, middleware::Next, response::Response};
use sqlx::PgPool;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;

/// Tenant database pool, injected by middleware
#[derive(Clone)]
pub struct TenantPool(pub PgPool);

/// Tenant row from the main registry
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ValidatedTenant {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub database: String,
}

/// Validates the tenant from the JWT against the main registry: it must exist
/// and be active (not trashed or deleted). Injects the tenant and its pool.
pub async fn validate_tenant_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before tenant validation"))?;

    let main_pool = DatabaseManager::main_pool().await?;

    let tenant = sqlx::query_as::<_, ValidatedTenant>(
        r#"
        SELECT id, name, display_name, database
        FROM tenants
        WHERE database = $1
          AND is_active = true
          AND trashed_at IS NULL
          AND deleted_at IS NULL
        "#,
    )
    .bind(&auth_user.database)
    .fetch_optional(&main_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error validating tenant: {}", e);
        ApiError::internal_server_error("Failed to validate tenant")
    })?
    .ok_or_else(|| {
        tracing::warn!("Tenant validation failed: '{}' not found or inactive", auth_user.database);
        ApiError::forbidden(format!("Tenant '{}' is not active or does not exist", auth_user.tenant))
    })?;

    tracing::debug!("Tenant validation successful: {} ({})", tenant.name, tenant.database);

    let tenant_pool = DatabaseManager::tenant_pool(&tenant.database).await.map_err(|e| {
        tracing::error!("Failed to get database pool for tenant '{}': {}", tenant.database, e);
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(tenant);
    request.extensions_mut().insert(TenantPool(tenant_pool));

    Ok(next.run(request).await)
}

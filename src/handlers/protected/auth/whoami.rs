use axum::Extension;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedTenant, ValidatedUser};
use crate::types::AccessLevel;

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub id: Uuid,
    pub auth: String,
    pub name: String,
    pub access: AccessLevel,
    pub tenant: String,
    pub tenant_display_name: String,
    pub database: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// GET /api/auth/whoami - Current user and tenant
pub async fn whoami_get(
    Extension(auth_user): Extension<AuthUser>,
    Extension(tenant): Extension<ValidatedTenant>,
    Extension(user): Extension<ValidatedUser>,
) -> ApiResult<WhoAmI> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(WhoAmI {
        id: user.id,
        auth: user.auth,
        name: user.name,
        access: user.access,
        tenant: tenant.name,
        tenant_display_name: tenant.display_name,
        database: tenant.database,
        expires_at: Utc.timestamp_opt(auth_user.claims.exp, 0).single(),
    }))
}

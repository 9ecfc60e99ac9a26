// handlers/public/auth/refresh.rs - POST /auth/refresh handler

use axum::Json;
use serde::Deserialize;

use super::session::TokenResponse;
use crate::auth::{generate_jwt, validate_jwt, Claims};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{ServiceError, TenantService, UserService};
use crate::types::AccessLevel;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub token: String,
}

/// POST /auth/refresh - Exchange a (possibly expired) token for a fresh one
///
/// The signature must verify and the user must still be active with the
/// same login and access level. Sudo tokens are not refreshable.
pub async fn refresh_post(Json(body): Json<RefreshRequest>) -> ApiResult<TokenResponse> {
    let old = validate_jwt(&body.token, true)?;
    if old.access == AccessLevel::Root {
        return Err(ApiError::unauthorized("Elevated tokens cannot be refreshed"));
    }

    let tenant = TenantService::new()
        .await?
        .find_active_tenant(&old.tenant)
        .await?
        .filter(|t| t.database == old.database)
        .ok_or_else(|| ApiError::unauthorized("Tenant is no longer active"))?;

    let pool = DatabaseManager::tenant_pool(&tenant.database).await?;
    let user = match UserService::new(pool).get(old.user_id).await {
        Ok(user) if user.trashed_at.is_none() => user,
        Ok(_) | Err(ServiceError::NotFound(_)) => return Err(ApiError::unauthorized("User is no longer active")),
        Err(e) => return Err(e.into()),
    };

    if user.auth != old.user || user.access != old.access {
        tracing::warn!("Refresh refused for '{}': account changed since issue", old.user);
        return Err(ApiError::unauthorized("User account has changed; log in again"));
    }
    if user.access == AccessLevel::Deny {
        return Err(ApiError::forbidden("User access denied"));
    }

    let claims = Claims::new(tenant.name, tenant.database, user.auth.clone(), user.id, user.access);
    let token = generate_jwt(&claims)?;
    Ok(ApiResponse::success(TokenResponse::new(token, &claims, &user)))
}

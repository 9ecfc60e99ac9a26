// handlers/public/auth/login.rs - POST /auth/login/:tenant/:user handler

use axum::{extract::Path, Json};
use serde::Deserialize;

use super::session::TokenResponse;
use crate::auth::{generate_jwt, Claims};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{TenantService, UserService};
use crate::types::AccessLevel;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

/// POST /auth/login/:tenant/:user - Authenticate and receive a JWT
///
/// 404 for an unknown or inactive tenant, 401 for an unknown user or wrong
/// password, 403 for a user with `deny` access.
pub async fn login_post(
    Path((tenant_name, auth)): Path<(String, String)>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<TokenResponse> {
    let tenant = TenantService::new()
        .await?
        .find_active_tenant(&tenant_name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Tenant not found: {}", tenant_name)))?;

    let pool = DatabaseManager::tenant_pool(&tenant.database).await?;
    let user = UserService::new(pool)
        .authenticate(&auth, &body.password)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Failed login for '{}' in tenant '{}'", auth, tenant.name);
            ApiError::unauthorized("Invalid username or password")
        })?;

    if user.access == AccessLevel::Deny {
        tracing::warn!("Login refused for '{}' in tenant '{}': deny access", user.auth, tenant.name);
        return Err(ApiError::forbidden("User access denied"));
    }

    let claims = Claims::new(tenant.name, tenant.database, user.auth.clone(), user.id, user.access);
    let token = generate_jwt(&claims)?;

    tracing::info!("User '{}' logged in to tenant '{}'", user.auth, claims.tenant);
    Ok(ApiResponse::success(TokenResponse::new(token, &claims, &user)))
}

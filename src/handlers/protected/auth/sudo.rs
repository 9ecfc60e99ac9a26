// handlers/protected/auth/sudo.rs - POST /api/auth/sudo handler

use axum::{Extension, Json};
use serde::Deserialize;

use crate::auth::{generate_jwt, verify_password};
use crate::error::ApiError;
use crate::handlers::public::auth::TokenResponse;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, TenantPool, ValidatedUser};
use crate::services::UserService;
use crate::types::AccessLevel;

#[derive(Debug, Deserialize)]
pub struct SudoRequest {
    pub password: String,
}

/// POST /api/auth/sudo - Exchange a `full` session for a short-lived root token
///
/// The password is re-checked. The root token reaches /api/root/* and
/// expires after `sudo_expiry_minutes`.
pub async fn sudo_post(
    Extension(auth_user): Extension<AuthUser>,
    Extension(user): Extension<ValidatedUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<SudoRequest>,
) -> ApiResult<TokenResponse> {
    user.require(AccessLevel::Full)?;

    let record = UserService::new(pool).get(user.id).await?;
    if !verify_password(&body.password, &record.password_hash) {
        tracing::warn!("Sudo refused for '{}': wrong password", user.auth);
        return Err(ApiError::unauthorized("Invalid password"));
    }

    let claims = auth_user.claims.elevated();
    let token = generate_jwt(&claims)?;

    tracing::info!("User '{}' elevated to root in tenant '{}'", user.auth, claims.tenant);
    Ok(ApiResponse::success(TokenResponse::new(token, &claims, &record)))
}

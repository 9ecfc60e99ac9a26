use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

use super::auth::AuthUser;
use super::validate_tenant::TenantPool;
use crate::error::ApiError;
use crate::services::Actor;
use crate::types::AccessLevel;

/// User from the tenant's users table, with the access level the token grants
#[derive(Clone, Debug)]
pub struct ValidatedUser {
    pub id: Uuid,
    pub name: String,
    pub auth: String,
    pub access: AccessLevel,
}

impl ValidatedUser {
    /// Fail with 403 unless the user holds at least `level`
    pub fn require(&self, level: AccessLevel) -> Result<(), ApiError> {
        if self.access >= level {
            Ok(())
        } else {
            tracing::warn!("User '{}' with {} access attempted a {} operation", self.auth, self.access, level);
            Err(ApiError::forbidden(format!("This operation requires {} access", level)))
        }
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            access: self.access,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    auth: String,
    access: AccessLevel,
}

/// A token's access must match the stored level; root tokens come from sudo by `full` users.
pub fn token_access_matches(token: AccessLevel, stored: AccessLevel) -> bool {
    token == stored || (token == AccessLevel::Root && stored == AccessLevel::Full)
}

/// Validates the user from the JWT against the tenant's users table: active,
/// same login, same access level, and not `deny`.
pub async fn validate_user_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let TenantPool(tenant_pool) = request
        .extensions()
        .get::<TenantPool>()
        .cloned()
        .ok_or_else(|| ApiError::internal_server_error("Tenant pool required before user validation"))?;

    let user = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, name, auth, access
        FROM users
        WHERE id = $1
          AND trashed_at IS NULL
          AND deleted_at IS NULL
        "#,
    )
    .bind(auth_user.user_id)
    .fetch_optional(&tenant_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error validating user in tenant '{}': {}", auth_user.database, e);
        ApiError::internal_server_error("Failed to validate user")
    })?
    .ok_or_else(|| {
        tracing::warn!(
            "User validation failed: '{}' ({}) not found or inactive in tenant '{}'",
            auth_user.user,
            auth_user.user_id,
            auth_user.database
        );
        ApiError::forbidden(format!("User '{}' is not active in tenant '{}'", auth_user.user, auth_user.tenant))
    })?;

    if user.auth != auth_user.user {
        tracing::warn!("JWT user '{}' doesn't match database auth '{}'", auth_user.user, user.auth);
        return Err(ApiError::forbidden("User authentication mismatch"));
    }

    if !token_access_matches(auth_user.access, user.access) {
        tracing::warn!("JWT access '{}' doesn't match database access '{}'", auth_user.access, user.access);
        return Err(ApiError::forbidden("User access level mismatch"));
    }

    if user.access == AccessLevel::Deny {
        tracing::warn!("User '{}' has deny access", user.auth);
        return Err(ApiError::forbidden("User access denied"));
    }

    let validated_user = ValidatedUser {
        id: user.id,
        name: user.name,
        auth: user.auth,
        access: auth_user.access,
    };

    tracing::debug!(
        "User validation successful: {} ({}) with {} access in tenant '{}'",
        validated_user.name,
        validated_user.auth,
        validated_user.access,
        auth_user.tenant
    );

    request.extensions_mut().insert(validated_user);
    Ok(next.run(request).await)
}

/// Guards the elevated tier: only sudo-issued root tokens pass
pub async fn require_root_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<ValidatedUser>()
        .ok_or_else(|| ApiError::unauthorized("User validation required before root access"))?;
    user.require(AccessLevel::Root)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(access: AccessLevel) -> ValidatedUser {
        ValidatedUser {
            id: Uuid::new_v4(),
            name: "Elder Board".into(),
            auth: "elders".into(),
            access,
        }
    }

    #[test]
    fn require_checks_level_ordering() {
        assert!(user(AccessLevel::Edit).require(AccessLevel::Read).is_ok());
        assert!(user(AccessLevel::Edit).require(AccessLevel::Edit).is_ok());
        let err = user(AccessLevel::Edit).require(AccessLevel::Full).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
        assert!(user(AccessLevel::Root).require(AccessLevel::Full).is_ok());
    }

    #[test]
    fn sudo_tokens_match_full_users_only() {
        assert!(token_access_matches(AccessLevel::Edit, AccessLevel::Edit));
        assert!(token_access_matches(AccessLevel::Root, AccessLevel::Full));
        assert!(!token_access_matches(AccessLevel::Root, AccessLevel::Edit));
        assert!(!token_access_matches(AccessLevel::Full, AccessLevel::Edit));
    }
}

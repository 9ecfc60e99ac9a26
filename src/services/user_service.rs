use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{patched_text, required_text, unique_conflict, Actor, ServiceError, ServiceResult};
use crate::auth::{hash_password, verify_password};
use crate::database::models::user::{NewUser, User, UserPatch};
use crate::types::AccessLevel;

const MIN_PASSWORD_LEN: usize = 8;

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: NewUser) -> ServiceResult<User> {
        validate_auth(&input.auth)?;
        let name = required_text("name", &input.name)?;
        validate_password(&input.password)?;
        let access = input.access.unwrap_or(AccessLevel::Read);
        validate_assignable(access)?;

        let password_hash = hash_password(&input.password)?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (auth, name, password_hash, access) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(input.auth.trim())
        .bind(name)
        .bind(password_hash)
        .bind(access)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, &[("users_auth_key", "A user with that login already exists")]))?;

        info!("Created user {} with {} access", user.auth, user.access);
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }

    pub async fn find_by_auth(&self, auth: &str) -> ServiceResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE auth = $1 AND deleted_at IS NULL AND trashed_at IS NULL",
        )
        .bind(auth)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Look up a login and check its password. `None` covers both an unknown login and a wrong password.
    pub async fn authenticate(&self, auth: &str, password: &str) -> ServiceResult<Option<User>> {
        Ok(self
            .find_by_auth(auth)
            .await?
            .filter(|user| verify_password(password, &user.password_hash)))
    }

    pub async fn list(&self) -> ServiceResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE deleted_at IS NULL ORDER BY auth")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn update(&self, id: Uuid, patch: UserPatch, actor: &Actor) -> ServiceResult<User> {
        let name = patched_text("name", patch.name)?;
        if let Some(access) = patch.access {
            validate_assignable(access)?;
            if id == actor.user_id && access < AccessLevel::Full {
                return Err(ServiceError::conflict("You cannot lower your own access level"));
            }
        }
        let password_hash = match patch.password {
            Some(password) => {
                validate_password(&password)?;
                Some(hash_password(&password)?)
            }
            None => None,
        };

        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                access = COALESCE($3, access),
                password_hash = COALESCE($4, password_hash),
                updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(patch.access)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("User not found"))
    }

    pub async fn delete(&self, id: Uuid, actor: &Actor) -> ServiceResult<User> {
        if id == actor.user_id {
            return Err(ServiceError::conflict("You cannot delete your own account"));
        }
        sqlx::query_as::<_, User>(
            "UPDATE users SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("User not found"))
    }
}

pub(crate) fn validate_auth(auth: &str) -> ServiceResult<()> {
    let auth = auth.trim();
    if auth.len() < 2 || auth.len() > 64 {
        return Err(ServiceError::field("auth", "Login must be 2 to 64 characters"));
    }
    if !auth.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@')) {
        return Err(ServiceError::field(
            "auth",
            "Login can only contain letters, numbers, dots, hyphens, underscores and @",
        ));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::field(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

/// Root is only ever issued through sudo
fn validate_assignable(access: AccessLevel) -> ServiceResult<()> {
    if access == AccessLevel::Root {
        return Err(ServiceError::field("access", "Root access cannot be assigned to a user"));
    }
    Ok(())
}

use serde::Serialize;
use uuid::Uuid;

use crate::auth::Claims;
use crate::database::models::user::User;
use crate::types::AccessLevel;

/// User details returned alongside a token
#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub auth: String,
    pub name: String,
    pub access: AccessLevel,
    pub tenant: String,
    pub database: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub user: SessionUser,
}

impl TokenResponse {
    pub fn new(token: String, claims: &Claims, user: &User) -> Self {
        Self {
            token,
            expires_in: claims.expires_in(),
            user: SessionUser {
                id: user.id,
                auth: user.auth.clone(),
                name: user.name.clone(),
                access: claims.access,
                tenant: claims.tenant.clone(),
                database: claims.database.clone(),
            },
        }
    }
}

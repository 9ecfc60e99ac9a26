use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;
use crate::types::AccessLevel;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub tenant: String,
    pub database: String,
    pub user: String,
    pub user_id: Uuid,
    pub access: AccessLevel,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(tenant: String, database: String, user: String, user_id: Uuid, access: AccessLevel) -> Self {
        let expiry_hours = config::config().security.jwt_expiry_hours;
        Self::with_lifetime(tenant, database, user, user_id, access, Duration::hours(expiry_hours as i64))
    }

    /// Short-lived root claims issued by sudo
    pub fn elevated(&self) -> Self {
        let minutes = config::config().security.sudo_expiry_minutes;
        Self::with_lifetime(
            self.tenant.clone(),
            self.database.clone(),
            self.user.clone(),
            self.user_id,
            AccessLevel::Root,
            Duration::minutes(minutes as i64),
        )
    }

    fn with_lifetime(
        tenant: String,
        database: String,
        user: String,
        user_id: Uuid,
        access: AccessLevel,
        lifetime: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            tenant,
            database,
            user,
            user_id,
            access,
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn expires_in(&self) -> i64 {
        self.exp - self.iat
    }
}

fn secret() -> Result<&'static str, AuthError> {
    let secret = config::config().security.jwt_secret.as_str();
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    Ok(secret)
}

pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    let encoding_key = EncodingKey::from_secret(secret()?.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Verify signature and decode claims. Refresh passes `allow_expired`.
pub fn validate_jwt(token: &str, allow_expired: bool) -> Result<Claims, AuthError> {
    let decoding_key = DecodingKey::from_secret(secret()?.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = !allow_expired;

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    Ok(token_data.claims)
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// False for a wrong password and for an unparseable stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> Claims {
        Claims::new(
            "grace-chapel".to_string(),
            "tenant_0123456789abcdef".to_string(),
            "pastor.j".to_string(),
            Uuid::new_v4(),
            AccessLevel::Full,
        )
    }

    #[test]
    fn token_round_trips_claims() {
        let claims = sample_claims();
        let token = generate_jwt(&claims).unwrap();
        let decoded = validate_jwt(&token, false).unwrap();
        assert_eq!(decoded.user_id, claims.user_id);
        assert_eq!(decoded.access, AccessLevel::Full);
        assert_eq!(decoded.database, "tenant_0123456789abcdef");
    }

    #[test]
    fn expired_token_only_accepted_for_refresh() {
        let mut claims = sample_claims();
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = generate_jwt(&claims).unwrap();

        assert!(matches!(validate_jwt(&token, false), Err(AuthError::InvalidToken(_))));
        assert!(validate_jwt(&token, true).is_ok());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = generate_jwt(&sample_claims()).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(validate_jwt(&tampered, true).is_err());
    }

    #[test]
    fn elevated_claims_are_root_and_short_lived() {
        let claims = sample_claims();
        let root = claims.elevated();
        assert_eq!(root.access, AccessLevel::Root);
        assert!(root.expires_in() < claims.expires_in());
        assert_eq!(root.user_id, claims.user_id);
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("shepherd-42").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("shepherd-42", &hash));
        assert!(!verify_password("shepherd-43", &hash));
        assert!(!verify_password("shepherd-42", "not-a-hash"));
    }
}

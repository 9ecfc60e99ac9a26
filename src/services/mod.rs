pub mod cell_group_service;
pub mod exit_service;
pub mod giving_service;
pub mod leadership_service;
pub mod member_service;
pub mod prayer_service;
pub mod tenant_service;
pub mod user_service;

pub use cell_group_service::CellGroupService;
pub use exit_service::ExitService;
pub use giving_service::GivingService;
pub use leadership_service::LeadershipService;
pub use member_service::MemberService;
pub use prayer_service::PrayerService;
pub use tenant_service::TenantService;
pub use user_service::UserService;

use uuid::Uuid;

use crate::auth::AuthError;
use crate::database::{is_unique_violation, DatabaseError};
use crate::filter::FilterError;
use crate::types::AccessLevel;

/// Errors raised by business operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Validation { field: Option<String>, message: String },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: None,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Database(DatabaseError::Sqlx(err))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// The authenticated user on whose behalf an operation runs
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub access: AccessLevel,
}

/// Map a unique violation on one of `constraints` to a conflict with the paired message.
pub(crate) fn unique_conflict(err: sqlx::Error, constraints: &[(&str, &str)]) -> ServiceError {
    for (constraint, message) in constraints {
        if is_unique_violation(&err, Some(constraint)) {
            return ServiceError::conflict(*message);
        }
    }
    err.into()
}

/// Trimmed, non-blank required text
pub(crate) fn required_text(field: &str, value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::field(field, format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Like `required_text` but for optional patch fields
pub(crate) fn patched_text(field: &str, value: Option<String>) -> ServiceResult<Option<String>> {
    value.map(|v| required_text(field, &v)).transpose()
}

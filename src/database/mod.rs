pub mod manager;
pub mod migrations;
pub mod models;

pub use manager::{DatabaseError, DatabaseManager};

/// Postgres SQLSTATE for unique_violation
pub const UNIQUE_VIOLATION: &str = "23505";

/// True when the error is a unique index violation, optionally on a named constraint.
pub fn is_unique_violation(err: &sqlx::Error, constraint: Option<&str>) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some(UNIQUE_VIOLATION)
                && constraint.map_or(true, |name| db.constraint() == Some(name))
        }
        _ => false,
    }
}

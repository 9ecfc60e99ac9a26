use sqlx::{Executor, PgPool};
use tracing::info;

use super::manager::DatabaseError;

const MAIN_SCHEMA: &str = include_str!("sql/main.sql");
const TENANT_SCHEMA: &str = include_str!("sql/tenant.sql");

/// Create the tenant registry in the main database. Idempotent.
pub async fn apply_main_schema(pool: &PgPool) -> Result<(), DatabaseError> {
    // Multi-statement scripts go through the simple query protocol
    pool.execute(MAIN_SCHEMA).await?;
    info!("Main schema is up to date");
    Ok(())
}

/// Create the church tables in a freshly provisioned tenant database. Idempotent.
pub async fn apply_tenant_schema(pool: &PgPool) -> Result<(), DatabaseError> {
    pool.execute(TENANT_SCHEMA).await?;
    info!("Tenant schema is up to date");
    Ok(())
}

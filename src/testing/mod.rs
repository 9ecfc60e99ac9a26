//! Scratch tenant databases for database-backed unit tests.
//!
//! Pools here are created per test rather than through `DatabaseManager`,
//! whose cached pools would outlive each test's tokio runtime.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use uuid::Uuid;

use crate::database::{migrations, DatabaseManager};

pub struct TestContext {
    pub pool: PgPool,
    pub database: String,
}

impl TestContext {
    /// A fresh tenant database with the schema applied, or `None` when no
    /// Postgres is reachable through `DATABASE_URL`.
    pub async fn try_new() -> Option<Self> {
        match Self::new().await {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                eprintln!("skipping database test: {}", e);
                None
            }
        }
    }

    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let database = format!("tenant_test_{}", Uuid::new_v4().simple());

        let admin = connect("postgres").await?;
        admin.execute(format!("CREATE DATABASE \"{}\"", database).as_str()).await?;
        admin.close().await;

        let pool = connect(&database).await?;
        migrations::apply_tenant_schema(&pool).await?;
        Ok(Self { pool, database })
    }

    /// Drop the scratch database
    pub async fn cleanup(self) {
        self.pool.close().await;
        match connect("postgres").await {
            Ok(admin) => {
                let statement = format!("DROP DATABASE IF EXISTS \"{}\"", self.database);
                if let Err(e) = admin.execute(statement.as_str()).await {
                    eprintln!("failed to drop {}: {}", self.database, e);
                }
                admin.close().await;
            }
            Err(e) => eprintln!("failed to drop {}: {}", self.database, e),
        }
    }
}

async fn connect(database: &str) -> anyhow::Result<PgPool> {
    let url = DatabaseManager::build_connection_string(database)?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&url)
        .await?;
    Ok(pool)
}

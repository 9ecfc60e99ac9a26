use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::{migrations, DatabaseManager};

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::main_pool().await?;
    migrations::apply_main_schema(&pool).await?;

    let database = &config::config().database.main_database;
    output_success(
        output_format,
        &format!("Main schema applied to {}", database),
        &json!({ "database": database }),
    )
}

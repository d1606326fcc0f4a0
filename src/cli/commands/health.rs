use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;
use crate::error::AppError;

/// Ping the database with the configured connection settings
pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = crate::config::config();
    DatabaseManager::health_check().await.map_err(AppError::from)?;
    output_success(
        &output_format,
        "Database is reachable",
        Some(json!({
            "environment": format!("{:?}", config.environment).to_lowercase(),
            // Connection details stay out of production output
            "database": if crate::is_production!() { None } else { Some(&config.database.name) },
        })),
    )
}

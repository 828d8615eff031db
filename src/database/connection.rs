use mongodb::{Client, Database};
use tracing::{info, warn};

use crate::config::CheckoutConfig;
use crate::errors::{AppError, Result};

pub async fn get_db_client(config: &CheckoutConfig) -> Result<Database> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| AppError::configuration("DATABASE_URL must be set"))?;

    let client = Client::with_uri_str(database_url).await?;
    let db = client.database(&config.database_name);

    // Verify database is reachable by listing collections
    match db.list_collection_names().await {
        Ok(collections) => {
            info!("Connected to database: {}", config.database_name);
            info!("Collections found: {}", collections.len());
        }
        Err(e) => {
            warn!("Database '{}' may not exist or is inaccessible: {}", config.database_name, e);
        }
    }

    Ok(db)
}

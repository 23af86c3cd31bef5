//! Database setup and embedded migrations

use gitscope_config::DatabaseConfig;
use sqlx::PgPool;

use crate::error::{StorageError, StorageResult};

/// Run all pending migrations embedded from `./migrations`
///
/// # Errors
/// Returns `StorageError::MigrationFailed` if a migration cannot be applied
pub async fn run_migrations(pool: &PgPool) -> StorageResult<()> {
    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|source| StorageError::MigrationFailed { source })?;
    tracing::info!("Database migrations completed");
    Ok(())
}

/// Connect using `config` and migrate when `auto_migrate` is set
///
/// # Errors
/// Returns an error if the connection or a migration fails
pub async fn connect(config: &DatabaseConfig) -> StorageResult<PgPool> {
    tracing::info!(database = %config.safe_connection_string(), "Connecting to database");
    let pool = config
        .create_pool()
        .await
        .map_err(|source| StorageError::ConnectionFailed {
            message: config.safe_connection_string(),
            source,
        })?;

    if config.auto_migrate {
        run_migrations(&pool).await?;
    }
    Ok(pool)
}

use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use crate::config::Config;

pub type Db = SqlitePool;

pub async fn connect(config: &Config) -> anyhow::Result<Db> {
    // Foreign keys are enforced per connection; cascades depend on it.
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect_with(options)
        .await?;

    tracing::info!(url = %config.database_url, "Database connection pool established");
    Ok(pool)
}

/// Run all SQLx migrations from the `migrations/` directory embedded at compile time.
pub async fn run_migrations(pool: &Db) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Fresh in-memory store with the schema applied. A single connection keeps
/// every query on the same in-memory database.
#[cfg(test)]
pub async fn test_pool() -> Db {
    let pool = connect(&Config::for_tests()).await.expect("connect in-memory store");
    run_migrations(&pool).await.expect("apply migrations");
    pool
}

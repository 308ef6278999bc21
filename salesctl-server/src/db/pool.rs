//! Database connection pool management
//!
//! Uses sqlx PgPool with explicit connection limits. Every new connection
//! gets the report schema on its `search_path` and a statement timeout, so
//! templates can name tables unqualified and a runaway query is cut off by
//! the warehouse itself.

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

use crate::config::WarehouseConfig;
use crate::error::ServerError;

/// Create a PostgreSQL connection pool.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the connection fails.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool(&WarehouseConfig::with_url("postgres://localhost/warehouse")).await?;
/// ```
pub async fn create_pool(config: &WarehouseConfig) -> Result<PgPool, ServerError> {
    config.validate()?;

    let search_path = format!("SET search_path TO \"{}\"", config.dataset);
    let statement_timeout = format!(
        "SET statement_timeout = {}",
        config.statement_timeout.as_millis()
    );

    tracing::debug!(
        dataset = %config.dataset,
        max_connections = config.max_connections,
        timeout_ms = config.statement_timeout.as_millis() as u64,
        "creating warehouse pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .after_connect(move |conn, _meta| {
            let search_path = search_path.clone();
            let statement_timeout = statement_timeout.clone();
            Box::pin(async move {
                (&mut *conn).execute(search_path.as_str()).await?;
                (&mut *conn).execute(statement_timeout.as_str()).await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await?;

    Ok(pool)
}

//! Warehouse connection flags shared by commands that query

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use salesctl_core::Warehouse;
use salesctl_server::db::{create_pool, PgWarehouse};
use salesctl_server::WarehouseConfig;

/// Connection settings; flags override the environment
#[derive(Args, Debug, Clone)]
pub struct WarehouseArgs {
    /// Warehouse connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Schema holding the report tables
    #[arg(long, env = "SALESCTL_DATASET", default_value = "allwebi")]
    pub dataset: String,

    /// Connection pool size
    #[arg(long, env = "SALESCTL_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Per-statement deadline in seconds
    #[arg(long, env = "SALESCTL_STATEMENT_TIMEOUT_SECS", default_value_t = 30)]
    pub statement_timeout_secs: u64,
}

impl WarehouseArgs {
    pub fn config(&self) -> Result<WarehouseConfig> {
        let database_url = self
            .database_url
            .clone()
            .context("DATABASE_URL not set. Set via --database-url, DATABASE_URL env, or .env")?;

        let mut config = WarehouseConfig::with_url(database_url);
        config.dataset = self.dataset.clone();
        config.max_connections = self.max_connections;
        config.statement_timeout = Duration::from_secs(self.statement_timeout_secs);
        Ok(config)
    }

    /// Open the pool and wrap it as the execution handle.
    pub async fn connect(&self) -> Result<Arc<dyn Warehouse>> {
        let config = self.config()?;
        tracing::info!(dataset = %config.dataset, "connecting to warehouse");

        let pool = create_pool(&config)
            .await
            .context("Failed to create database pool")?;
        Ok(Arc::new(PgWarehouse::new(pool)))
    }
}

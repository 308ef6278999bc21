//! Warehouse configuration - connection and session settings
//!
//! Defaults:
//! - dataset: allwebi
//! - pool size: 5
//! - per-statement deadline: 30s

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ServerError;

const DEFAULT_DATASET: &str = "allwebi";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 30;

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("identifier regex"));

/// Warehouse configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseConfig {
    pub database_url: String,
    /// Schema placed on the session `search_path`
    pub dataset: String,
    pub max_connections: u32,
    /// Server-side deadline for a single statement
    pub statement_timeout: Duration,
}

impl WarehouseConfig {
    /// Create config for an explicit URL with default session settings
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            dataset: DEFAULT_DATASET.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            statement_timeout: Duration::from_secs(DEFAULT_STATEMENT_TIMEOUT_SECS),
        }
    }

    /// Reject settings that would be spliced into session SQL unsafely.
    pub fn validate(&self) -> Result<(), ServerError> {
        if !IDENT_RE.is_match(&self.dataset) {
            return Err(ServerError::Config(format!(
                "dataset '{}' is not a valid schema identifier",
                self.dataset
            )));
        }
        if self.max_connections == 0 {
            return Err(ServerError::Config("max_connections must be >= 1".into()));
        }
        if self.statement_timeout.is_zero() {
            return Err(ServerError::Config("statement timeout must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_url_uses_defaults() {
        let config = WarehouseConfig::with_url("postgres://wh/reports");
        assert_eq!(config.database_url, "postgres://wh/reports");
        assert_eq!(config.dataset, "allwebi");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.statement_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unsafe_dataset() {
        let config = WarehouseConfig {
            dataset: "allwebi; DROP TABLE tb_sites".into(),
            ..WarehouseConfig::with_url("postgres://wh/reports")
        };
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));
    }

    #[test]
    fn rejects_empty_pool() {
        let config = WarehouseConfig {
            max_connections: 0,
            ..WarehouseConfig::with_url("postgres://wh/reports")
        };
        assert!(config.validate().is_err());
    }
}

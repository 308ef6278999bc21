//! salesctl-server: paginated warehouse reports over HTTP
//!
//! - `config`: warehouse connection settings from the environment
//! - `db`: sqlx pool and the Postgres `Warehouse` adapter
//! - `reports`: the report catalogue, one configuration per report
//! - `http`: axum router, handlers and the JSON error surface

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod reports;

pub use config::WarehouseConfig;
pub use error::{ServerError, ServerResult};
pub use http::{build_router, run_server, AppState, ServerConfig};

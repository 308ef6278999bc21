//! Database layer - connection pool and the warehouse adapter
//!
//! # Design Principles
//!
//! - One pool per process, handed to handlers as `Arc<dyn Warehouse>`
//! - Session settings (schema, statement timeout) applied on connect
//! - Values only ever travel as bound parameters

pub mod decode;
pub mod pool;
pub mod warehouse;

pub use pool::create_pool;
pub use warehouse::PgWarehouse;

//! salesctl-core: query building and window-count pagination
//!
//! Turns a base template plus a set of optional filters into one
//! parameterized query, runs it through an injected `Warehouse`, and reads
//! the size of the filtered set off the first returned row.

pub mod builder;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod paginator;
pub mod params;
pub mod warehouse;

pub use builder::{BuiltQuery, Clause, QueryBuilder, QueryTemplate, RegionStyle};
pub use error::{QueryError, Result};
pub use filter::{Connective, Filter};
pub use pagination::{PageParams, PageRequest};
pub use paginator::{execute_page, fetch_page, fetch_rows, QueryResult};
pub use params::{BindKind, BindValue, Param};
pub use warehouse::{MemoryWarehouse, Record, Warehouse};

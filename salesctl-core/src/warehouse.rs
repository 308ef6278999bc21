//! Query execution capability
//!
//! Provides a trait for running a built query, with:
//! - the real implementation living next to the connection pool (salesctl-server)
//! - an in-memory implementation for testing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::builder::{BuiltQuery, TOTAL_RECORDS_COLUMN};
use crate::error::{QueryError, Result};

/// One result row: column name to value, as produced by the warehouse
pub type Record = serde_json::Map<String, Value>;

/// Trait for query execution (testable)
///
/// Implementations run the query exactly once. Retries and deadlines are
/// their own business.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn execute(&self, query: &BuiltQuery) -> Result<Vec<Record>>;
}

#[async_trait]
impl<W> Warehouse for Arc<W>
where
    W: Warehouse + ?Sized,
{
    async fn execute(&self, query: &BuiltQuery) -> Result<Vec<Record>> {
        (**self).execute(query).await
    }
}

/// In-memory warehouse for testing
///
/// Holds an already filtered and ordered table. Paginated queries are
/// answered the way the window-count SQL would be: the bound page is sliced
/// out and every row gets `total_records`. Unpaginated queries get the whole
/// table.
#[derive(Default)]
pub struct MemoryWarehouse {
    rows: Mutex<Vec<Record>>,
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
    executed: Mutex<Vec<BuiltQuery>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Record>) -> Self {
        let warehouse = Self::new();
        warehouse.set_rows(rows);
        warehouse
    }

    pub fn set_rows(&self, rows: Vec<Record>) {
        *self.rows.lock().unwrap() = rows;
    }

    /// Make every following execution fail with `message`
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(message.into());
    }

    /// Number of executions so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recently executed query
    pub fn last_query(&self) -> Option<BuiltQuery> {
        self.executed.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn execute(&self, query: &BuiltQuery) -> Result<Vec<Record>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.executed.lock().unwrap().push(query.clone());

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(QueryError::execution(message));
        }

        let rows = self.rows.lock().unwrap().clone();
        let Some(page) = query.page() else {
            return Ok(rows);
        };

        let total = rows.len();
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|mut row| {
                row.insert(TOTAL_RECORDS_COLUMN.to_string(), Value::from(total));
                row
            })
            .collect())
    }
}

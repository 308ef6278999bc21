//! Single-round-trip execution of built queries

use serde::Serialize;
use serde_json::Value;

use crate::builder::{BuiltQuery, QueryBuilder, TOTAL_RECORDS_COLUMN};
use crate::error::{QueryError, Result};
use crate::pagination::PageRequest;
use crate::warehouse::{Record, Warehouse};

/// One page of a report plus the size of the whole filtered set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub total_records: u64,
    pub rows: Vec<Record>,
}

/// Build a page query, run it once, and read the window count off row 0.
///
/// An empty page is a normal result with `total_records = 0`.
pub async fn fetch_page<W>(
    warehouse: &W,
    builder: QueryBuilder<'_>,
    page: PageRequest,
) -> Result<QueryResult>
where
    W: Warehouse + ?Sized,
{
    let query = builder.build_page(page)?;
    execute_page(warehouse, &query).await
}

/// Run a query produced by `QueryBuilder::build_page`.
pub async fn execute_page<W>(warehouse: &W, query: &BuiltQuery) -> Result<QueryResult>
where
    W: Warehouse + ?Sized,
{
    let page = query
        .page()
        .ok_or_else(|| QueryError::template("query was not built for a page"))?;

    tracing::debug!(
        params = query.params().len(),
        page = page.page(),
        limit = page.limit(),
        "executing paginated query"
    );

    let mut rows = warehouse.execute(query).await?;

    let total_records = match rows.first() {
        Some(first) => total_records(first)?,
        None => 0,
    };

    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    if rows.len() > limit {
        tracing::warn!(returned = rows.len(), limit, "warehouse returned more rows than requested");
        rows.truncate(limit);
    }

    tracing::debug!(total_records, returned = rows.len(), "page fetched");
    Ok(QueryResult {
        total_records,
        rows,
    })
}

/// Build an unpaginated query and run it once.
pub async fn fetch_rows<W>(warehouse: &W, builder: QueryBuilder<'_>) -> Result<Vec<Record>>
where
    W: Warehouse + ?Sized,
{
    let query = builder.build()?;
    tracing::debug!(params = query.params().len(), "executing query");
    warehouse.execute(&query).await
}

fn total_records(row: &Record) -> Result<u64> {
    let value = row.get(TOTAL_RECORDS_COLUMN).ok_or_else(|| {
        QueryError::execution(format!("result rows carry no '{}' column", TOTAL_RECORDS_COLUMN))
    })?;

    // Some drivers hand 64-bit integers back as strings
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| {
        QueryError::execution(format!(
            "'{}' is not a non-negative integer: {}",
            TOTAL_RECORDS_COLUMN, value
        ))
    })
}

//! Postgres-wire warehouse adapter
//!
//! Rewrites `@name` placeholders to `$n`, binds each parameter with its
//! matching sqlx type, and decodes rows into open records.

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};

use salesctl_core::{BindValue, BuiltQuery, QueryError, Record, Warehouse};

use super::decode::row_to_record;

/// Warehouse backed by a sqlx connection pool
#[derive(Clone)]
pub struct PgWarehouse {
    pool: PgPool,
}

impl PgWarehouse {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn execute(&self, query: &BuiltQuery) -> Result<Vec<Record>, QueryError> {
        let sql = query.to_positional();

        let mut statement = sqlx::query(&sql);
        for param in query.params() {
            statement = bind(statement, &param.value);
        }

        let rows: Vec<PgRow> = statement.fetch_all(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "warehouse query failed");
            QueryError::execution(e.to_string())
        })?;

        tracing::debug!(rows = rows.len(), "warehouse query returned");
        rows.iter().map(row_to_record).collect()
    }
}

fn bind<'q>(
    statement: Query<'q, Postgres, PgArguments>,
    value: &BindValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        BindValue::Date(d) => statement.bind(*d),
        BindValue::Timestamp(ts) => statement.bind(*ts),
        BindValue::String(s) => statement.bind(s.clone()),
        BindValue::Int(i) => statement.bind(*i),
        BindValue::IntArray(ids) => statement.bind(ids.clone()),
        BindValue::StringArray(ids) => statement.bind(ids.clone()),
    }
}

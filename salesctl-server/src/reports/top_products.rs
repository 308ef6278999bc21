//! Best-selling products of a date range, pivoted into one quantity series
//! per product over every day of the range.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use salesctl_core::params::ensure_ordered;
use salesctl_core::{fetch_rows, Param, QueryBuilder, QueryError, QueryTemplate, Record, Warehouse};

use super::inputs::required_date;
use super::ReportError;

pub const NAME: &str = "top-products";

const DEFAULT_TOP: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct TopProductsRequest {
    pub start_date: String,
    pub end_date: String,
    /// How many products to chart
    #[serde(default = "default_top")]
    pub limit: i64,
}

fn default_top() -> i64 {
    DEFAULT_TOP
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopProductsResponse {
    pub dates: Vec<String>,
    /// Product id to quantity per entry of `dates`
    pub data: BTreeMap<String, Vec<i64>>,
}

static TEMPLATE: Lazy<QueryTemplate> = Lazy::new(|| {
    QueryTemplate::new(
        r#"WITH top_products AS (
    SELECT product_id, SUM(daily_purchase_quantity) AS total_purchase_quantity
    FROM mv_daily_product_sales
    WHERE order_date BETWEEN @start_date AND @end_date
    GROUP BY product_id
    ORDER BY total_purchase_quantity DESC
    LIMIT @top_limit
)
SELECT
    dd.item_date,
    tp.product_id::text AS product_id,
    COALESCE(SUM(dps.daily_purchase_quantity), 0)::bigint AS total_quantity
FROM top_products AS tp
CROSS JOIN tb_date_dimension AS dd
LEFT JOIN mv_daily_product_sales AS dps
    ON dd.item_date = dps.order_date AND tp.product_id = dps.product_id
WHERE dd.item_date BETWEEN @start_date AND @end_date
  AND dd.type = 1
GROUP BY dd.item_date, tp.product_id"#,
    )
    .order_by("dd.item_date, tp.product_id")
});

impl TopProductsRequest {
    fn params(&self) -> Result<Vec<Param>, QueryError> {
        let start = required_date("start_date", &self.start_date)?;
        let end = required_date("end_date", &self.end_date)?;
        ensure_ordered("start_date", &start, "end_date", &end)?;

        if self.limit < 1 {
            return Err(QueryError::invalid("limit", format!("must be >= 1, got {}", self.limit)));
        }

        Ok(vec![
            Param::date("start_date", start),
            Param::date("end_date", end),
            Param::int("top_limit", self.limit),
        ])
    }
}

pub async fn run(warehouse: &dyn Warehouse, request: &TopProductsRequest) -> Result<TopProductsResponse, ReportError> {
    let mut builder = QueryBuilder::new(&TEMPLATE);
    for param in request.params()? {
        builder.bind(param)?;
    }

    let rows = fetch_rows(warehouse, builder).await?;
    let response = pivot(&rows);
    tracing::debug!(days = response.dates.len(), products = response.data.len(), "top products pivoted");
    Ok(response)
}

fn text(row: &Record, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Spread `(date, product, quantity)` rows over a sorted date axis.
///
/// Missing cells stay zero.
fn pivot(rows: &[Record]) -> TopProductsResponse {
    let dates: Vec<String> = rows
        .iter()
        .filter_map(|row| text(row, "item_date"))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index: BTreeMap<&str, usize> = dates.iter().enumerate().map(|(i, d)| (d.as_str(), i)).collect();

    let mut data: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for row in rows {
        let (Some(date), Some(product)) = (text(row, "item_date"), text(row, "product_id")) else {
            continue;
        };
        let Some(&slot) = index.get(date.as_str()) else {
            continue;
        };
        let quantity = row.get("total_quantity").and_then(Value::as_i64).unwrap_or(0);
        data.entry(product).or_insert_with(|| vec![0; dates.len()])[slot] = quantity;
    }

    TopProductsResponse { dates, data }
}

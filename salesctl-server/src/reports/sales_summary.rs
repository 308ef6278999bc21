//! Sales summary for a set of products: quantity sold in a date range and
//! its share of all quantity sold in that range.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use salesctl_core::params::ensure_ordered;
use salesctl_core::{fetch_rows, Param, QueryBuilder, QueryError, QueryTemplate, Warehouse};

use super::inputs::required_date;
use super::ReportError;

pub const NAME: &str = "product-sales-summary";

/// Products plus an inclusive date range; shared with the sales trend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductRangeRequest {
    pub product_ids: Vec<String>,
    pub start_date: String,
    pub end_date: String,
}

impl ProductRangeRequest {
    /// Validate and turn into the `product_ids`, `start_date` and
    /// `end_date` parameters.
    pub fn params(&self) -> Result<Vec<Param>, QueryError> {
        let ids: Vec<String> = self
            .product_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
            .collect();
        if ids.is_empty() {
            return Err(QueryError::invalid("product_ids", "at least one product id is required"));
        }

        let start = required_date("start_date", &self.start_date)?;
        let end = required_date("end_date", &self.end_date)?;
        ensure_ordered("start_date", &start, "end_date", &end)?;

        Ok(vec![
            Param::string_array("product_ids", ids),
            Param::date("start_date", start),
            Param::date("end_date", end),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_quantity: i64,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResponse {
    pub result: Summary,
}

static TEMPLATE: Lazy<QueryTemplate> = Lazy::new(|| {
    QueryTemplate::new(
        r#"WITH product_sales AS (
    SELECT SUM(daily_purchase_quantity)::bigint AS total_quantity
    FROM mv_daily_product_sales
    WHERE product_id::text = ANY(@product_ids)
      AND order_date BETWEEN @start_date AND @end_date
),
total_sales AS (
    SELECT SUM(daily_purchase_quantity)::bigint AS total_quantity
    FROM mv_daily_product_sales
    WHERE order_date BETWEEN @start_date AND @end_date
)
SELECT
    COALESCE(p.total_quantity, 0) AS total_quantity,
    CASE
        WHEN COALESCE(t.total_quantity, 0) = 0 THEN 0
        ELSE ROUND(p.total_quantity::numeric / t.total_quantity, 6)
    END::float8 AS percentage
FROM product_sales AS p
CROSS JOIN total_sales AS t"#,
    )
});

pub async fn run(warehouse: &dyn Warehouse, request: &ProductRangeRequest) -> Result<SummaryResponse, ReportError> {
    let mut builder = QueryBuilder::new(&TEMPLATE);
    for param in request.params()? {
        builder.bind(param)?;
    }

    let rows = fetch_rows(warehouse, builder).await?;
    let row = rows.first().ok_or(ReportError::NoData(NAME))?;

    let total_quantity = row.get("total_quantity").and_then(Value::as_i64).unwrap_or(0);
    let percentage = row.get("percentage").and_then(Value::as_f64);
    tracing::debug!(total_quantity, ?percentage, "sales summary computed");

    Ok(SummaryResponse {
        result: Summary {
            total_quantity,
            percentage,
        },
    })
}

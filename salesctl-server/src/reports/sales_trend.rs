//! Daily quantity and USD revenue series for a set of products, shaped for
//! a chart. Only days on which the products sold appear in the series.

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;

use salesctl_core::{fetch_rows, QueryBuilder, QueryTemplate, Record, Warehouse};

use super::sales_summary::ProductRangeRequest;
use super::ReportError;

pub const NAME: &str = "product-sales-report";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSeries {
    #[serde(rename = "xAxis")]
    pub x_axis: Vec<Value>,
    pub qty_data: Vec<i64>,
    pub gmv_data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResponse {
    /// Number of days with sales in the series
    pub total: usize,
    pub result: TrendSeries,
}

static TEMPLATE: Lazy<QueryTemplate> = Lazy::new(|| {
    QueryTemplate::new(
        r#"SELECT
    dd.item_date,
    COALESCE(SUM(dps.daily_purchase_quantity), 0)::bigint AS daily_purchase_quantity,
    COALESCE(SUM(CASE
        WHEN s.currency = 'USD' THEN dps.total_order_amount::numeric
        ELSE ROUND((dps.total_order_amount * er.rate_to_cny / er_usd.rate_to_cny)::numeric, 2)
    END), 0)::float8 AS total_order_amount
FROM tb_date_dimension AS dd
LEFT JOIN mv_daily_product_sales AS dps
    ON dd.item_date = dps.order_date
LEFT JOIN tb_sites AS s ON s.site_id = dps.site_id
LEFT JOIN tb_exchange_rates AS er ON s.currency = er.currency_symbol AND dps.order_month = er.exchange_date
LEFT JOIN tb_exchange_rates AS er_usd ON er_usd.currency_symbol = 'USD' AND dps.order_month = er_usd.exchange_date
WHERE dd.type = 1
  AND dps.product_id::text = ANY(@product_ids)
  AND dd.item_date BETWEEN @start_date AND @end_date
GROUP BY dd.item_date"#,
    )
    .order_by("dd.item_date")
});

pub async fn run(warehouse: &dyn Warehouse, request: &ProductRangeRequest) -> Result<TrendResponse, ReportError> {
    let mut builder = QueryBuilder::new(&TEMPLATE);
    for param in request.params()? {
        builder.bind(param)?;
    }

    let rows = fetch_rows(warehouse, builder).await?;
    let result = series(&rows);
    tracing::debug!(days = result.x_axis.len(), "sales trend computed");

    Ok(TrendResponse {
        total: result.x_axis.len(),
        result,
    })
}

fn series(rows: &[Record]) -> TrendSeries {
    let mut out = TrendSeries::default();
    for row in rows {
        out.x_axis.push(row.get("item_date").cloned().unwrap_or(Value::Null));
        out.qty_data
            .push(row.get("daily_purchase_quantity").and_then(Value::as_i64).unwrap_or(0));
        out.gmv_data
            .push(row.get("total_order_amount").and_then(Value::as_f64).unwrap_or(0.0));
    }
    out
}

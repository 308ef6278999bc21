//! Product analysis: per SKU and site sales in a "today" window compared
//! with a "yesterday" window.
//!
//! The query has two filter regions, one per window. Site and online-time
//! filters apply to both; department filters only narrow the today side.
//! The executed SQL is echoed in the response as `sql_query`.

use once_cell::sync::Lazy;
use serde::Deserialize;

use salesctl_core::{PageParams, Param, QueryError, QueryTemplate};

use super::inputs::{optional_ids, paired_window};
use super::{FilterDef, PaginatedReport, Paged, ReportDef};

pub const NAME: &str = "product-analysis";

const TIMESTAMP_TEXT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductAnalysisRequest {
    #[serde(flatten)]
    pub page: PageParams,
    pub start_date_today: Option<String>,
    pub end_date_today: Option<String>,
    pub start_date_yesterday: Option<String>,
    pub end_date_yesterday: Option<String>,
    /// Comma separated department types
    pub department_types: Option<String>,
    pub brand_department_id: Option<i64>,
    /// Comma separated site ids
    pub site_id: Option<String>,
    pub online_time_start: Option<String>,
    pub online_time_end: Option<String>,
}

impl Paged for ProductAnalysisRequest {
    fn page_params(&self) -> PageParams {
        self.page
    }
}

const QUERY: &str = r#"WITH today AS (
    SELECT
        oi.sku,
        MAX(oi.title) AS product_title,
        MAX(oi.link) AS link,
        MAX(oi.image_url) AS product_img,
        MAX(oi.online_time) AS online_time,
        ROUND(SUM(oi.price)::numeric, 2) AS total_order_amount_today,
        oi.site_id,
        SUM(oi.quantity)::bigint AS total_purchase_quantity_today,
        MAX(s.brand) AS site_name,
        MAX(bd.department_name) AS department_name,
        MAX(oi.original_price)::numeric AS original_price,
        MAX(oipp.purchase_price)::numeric AS purchase_price,
        MAX(oipp.buyer) AS buyer,
        MAX(s.currency) AS currency
    FROM tb_order_items AS oi
    LEFT JOIN tb_order_item_purchase_price AS oipp ON oi.id = oipp.order_item_id
    LEFT JOIN tb_sites AS s ON oi.site_id = s.site_id
    LEFT JOIN tb_brand_department AS bd ON s.brand_department_id = bd.id
    WHERE TRUE
    {today}
    GROUP BY oi.sku, oi.site_id
),
yesterday AS (
    SELECT
        oi.sku,
        oi.site_id,
        ROUND(SUM(oi.price)::numeric, 2) AS total_order_amount_yesterday,
        SUM(oi.quantity)::bigint AS total_purchase_quantity_yesterday
    FROM tb_order_items AS oi
    WHERE TRUE
    {yesterday}
    GROUP BY oi.sku, oi.site_id
)
SELECT
    today.sku AS spu,
    today.product_title,
    today.link,
    today.online_time,
    today.total_order_amount_today::float8 AS total_order_amount,
    today.site_id,
    today.total_purchase_quantity_today AS total_purchase_quantity,
    yesterday.total_purchase_quantity_yesterday AS sales_growth_rate,
    yesterday.total_order_amount_yesterday::float8 AS revenue_growth_rate,
    today.site_name,
    today.product_img,
    today.department_name,
    today.original_price::float8 AS original_price,
    today.purchase_price::float8 AS purchase_price,
    today.buyer,
    CASE
        WHEN today.purchase_price = 0 OR today.original_price = 0 THEN '-'
        ELSE ROUND(today.original_price * er.rate_to_cny::numeric / (today.purchase_price + 4.16), 2)::text
    END AS product_multiplier,
    CASE
        WHEN yesterday.total_order_amount_yesterday IS NOT NULL AND yesterday.total_order_amount_yesterday <> 0
        THEN ROUND((today.total_order_amount_today - yesterday.total_order_amount_yesterday)
                   / yesterday.total_order_amount_yesterday * 100, 2)::float8
    END AS sales_growth_rate_b,
    er.rate_to_cny::float8 AS rate_to_cny
FROM today
LEFT JOIN yesterday ON today.sku = yesterday.sku AND today.site_id = yesterday.site_id
LEFT JOIN tb_exchange_rates AS er
    ON today.currency = er.currency_symbol AND er.exchange_date = to_char(CURRENT_TIMESTAMP, 'YYYY-MM')"#;

fn today_window(r: &ProductAnalysisRequest) -> Result<Option<Vec<Param>>, QueryError> {
    let window = paired_window(
        "start_date_today",
        r.start_date_today.as_deref(),
        "end_date_today",
        r.end_date_today.as_deref(),
    )?;
    Ok(window.map(|(start, end)| vec![Param::timestamp("today_start", start), Param::timestamp("today_end", end)]))
}

fn yesterday_window(r: &ProductAnalysisRequest) -> Result<Option<Vec<Param>>, QueryError> {
    let window = paired_window(
        "start_date_yesterday",
        r.start_date_yesterday.as_deref(),
        "end_date_yesterday",
        r.end_date_yesterday.as_deref(),
    )?;
    Ok(window.map(|(start, end)| {
        vec![Param::timestamp("yesterday_start", start), Param::timestamp("yesterday_end", end)]
    }))
}

fn site_ids(r: &ProductAnalysisRequest) -> Result<Option<Vec<Param>>, QueryError> {
    Ok(optional_ids("site_id", r.site_id.as_deref())?.map(|ids| vec![Param::int_array("site_ids", ids)]))
}

/// `online_time` is stored as text; the bounds are validated and
/// normalized so the text comparison orders like time.
fn online_range(r: &ProductAnalysisRequest) -> Result<Option<Vec<Param>>, QueryError> {
    let window = paired_window(
        "online_time_start",
        r.online_time_start.as_deref(),
        "online_time_end",
        r.online_time_end.as_deref(),
    )?;
    Ok(window.map(|(start, end)| {
        vec![
            Param::string("online_time_start", start.format(TIMESTAMP_TEXT).to_string()),
            Param::string("online_time_end", end.format(TIMESTAMP_TEXT).to_string()),
        ]
    }))
}

static REPORT: Lazy<ReportDef<ProductAnalysisRequest>> = Lazy::new(|| {
    ReportDef::<ProductAnalysisRequest>::new(
        NAME,
        QueryTemplate::new(QUERY)
            .continue_region("today")
            .continue_region("yesterday")
            .order_by("total_purchase_quantity DESC"),
    )
    .filter(FilterDef::and(
        "today_window",
        "today",
        "oi.order_created_at BETWEEN @today_start AND @today_end",
        today_window,
    ))
    .filter(FilterDef::and(
        "department_types",
        "today",
        "bd.department_type = ANY(@department_types)",
        |r| {
            Ok(optional_ids("department_types", r.department_types.as_deref())?
                .map(|ids| vec![Param::int_array("department_types", ids)]))
        },
    ))
    .filter(FilterDef::and(
        "brand_department_id",
        "today",
        "s.brand_department_id = @brand_department_id",
        |r| Ok(r.brand_department_id.map(|id| vec![Param::int("brand_department_id", id)])),
    ))
    .filter(FilterDef::and("site_today", "today", "oi.site_id = ANY(@site_ids)", site_ids))
    .filter(FilterDef::and(
        "online_today",
        "today",
        "oi.online_time BETWEEN @online_time_start AND @online_time_end",
        online_range,
    ))
    .filter(FilterDef::and(
        "yesterday_window",
        "yesterday",
        "oi.order_created_at BETWEEN @yesterday_start AND @yesterday_end",
        yesterday_window,
    ))
    .filter(FilterDef::and("site_yesterday", "yesterday", "oi.site_id = ANY(@site_ids)", site_ids))
    .filter(FilterDef::and(
        "online_yesterday",
        "yesterday",
        "oi.online_time BETWEEN @online_time_start AND @online_time_end",
        online_range,
    ))
    .echo_sql()
});

impl PaginatedReport for ProductAnalysisRequest {
    fn definition() -> &'static ReportDef<Self> {
        &REPORT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::run_paginated;
    use salesctl_core::{BindValue, MemoryWarehouse};
    use serde_json::json;

    fn request(body: serde_json::Value) -> ProductAnalysisRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn template_is_consistent() {
        REPORT.template.validate().unwrap();
    }

    #[test]
    fn shared_filters_land_in_both_windows() {
        let request = request(json!({
            "start_date_today": "2024-03-02 00:00:00",
            "end_date_today": "2024-03-02 23:59:59",
            "start_date_yesterday": "2024-03-01 00:00:00",
            "end_date_yesterday": "2024-03-01 23:59:59",
            "site_id": "4,9"
        }));
        let builder = REPORT.builder(&request).unwrap();

        let today: Vec<_> = builder.clauses().iter().filter(|c| c.region == "today").map(|c| c.filter).collect();
        let yesterday: Vec<_> = builder
            .clauses()
            .iter()
            .filter(|c| c.region == "yesterday")
            .map(|c| c.filter)
            .collect();
        assert_eq!(today, ["today_window", "site_today"]);
        assert_eq!(yesterday, ["yesterday_window", "site_yesterday"]);

        // one parameter serves both regions
        let site_params = builder.params().iter().filter(|p| p.name == "site_ids").count();
        assert_eq!(site_params, 1);
    }

    #[test]
    fn department_filters_only_narrow_today() {
        let request = request(json!({ "department_types": "1, 3", "brand_department_id": 8 }));
        let query = REPORT.builder(&request).unwrap().build().unwrap();

        let yesterday = query
            .sql()
            .split("yesterday AS (")
            .nth(1)
            .and_then(|cte| cte.split("GROUP BY").next())
            .unwrap();
        assert!(!yesterday.contains("department"));
        assert_eq!(query.param("department_types"), Some(&BindValue::IntArray(vec![1, 3])));
        assert_eq!(query.param("brand_department_id"), Some(&BindValue::Int(8)));
    }

    #[test]
    fn online_bounds_are_normalized_text() {
        let request = request(json!({
            "online_time_start": "2024-03-01",
            "online_time_end": "2024-03-05T12:00:00"
        }));
        let query = REPORT.builder(&request).unwrap().build().unwrap();

        assert_eq!(
            query.param("online_time_start"),
            Some(&BindValue::String("2024-03-01 00:00:00".into()))
        );
        assert_eq!(
            query.param("online_time_end"),
            Some(&BindValue::String("2024-03-05 12:00:00".into()))
        );
    }

    #[test]
    fn half_window_is_rejected() {
        let request = request(json!({ "start_date_today": "2024-03-02 00:00:00" }));
        assert!(REPORT.builder(&request).is_err());
    }

    #[tokio::test]
    async fn response_echoes_executed_sql() {
        let warehouse = MemoryWarehouse::new();
        let response = run_paginated(&warehouse, &request(json!({}))).await.unwrap();

        let sql = response.sql_query.as_deref().unwrap();
        assert!(sql.starts_with("WITH filtered_set AS ("));
        assert!(sql.ends_with("LIMIT $1 OFFSET $2"));
        assert_eq!(response.total, 0);
    }

    #[tokio::test]
    async fn echoed_sql_is_the_text_sent_to_the_warehouse() {
        let warehouse = MemoryWarehouse::new();
        let request = request(json!({ "site_id": "4,9", "brand_department_id": 8 }));
        let response = run_paginated(&warehouse, &request).await.unwrap();

        let executed = warehouse.last_query().unwrap();
        assert_eq!(response.sql_query.as_deref(), Some(executed.to_positional().as_str()));
        let echoed = response.sql_query.unwrap();
        assert!(!echoed.contains('@'));
        assert!(echoed.contains("oi.site_id = ANY($2)"));
    }
}

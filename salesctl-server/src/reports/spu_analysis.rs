//! SPU sales analysis: quantity and revenue per product and site, with each
//! product's share of overall quantity and USD revenue.
//!
//! Revenue is reported twice: `total_order_amount` in the site currency and
//! `total_order_amount_usd` converted through the monthly exchange-rate
//! table. Shares are computed against the unfiltered totals.

use once_cell::sync::Lazy;
use serde::Deserialize;

use salesctl_core::{PageParams, Param, QueryTemplate};

use super::inputs::{optional_date, optional_ids, optional_range, optional_timestamp};
use super::{FilterDef, PaginatedReport, Paged, ReportDef};

pub const NAME: &str = "product-sales-analysis-spu";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpuAnalysisRequest {
    #[serde(flatten)]
    pub page: PageParams,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub online_start_date: Option<String>,
    pub online_end_date: Option<String>,
    /// Comma separated site ids
    pub site_ids: Option<String>,
}

impl Paged for SpuAnalysisRequest {
    fn page_params(&self) -> PageParams {
        self.page
    }
}

const QUERY: &str = r#"WITH total_sales AS (
    SELECT
        SUM(CASE
              WHEN s.currency = 'USD' THEN dps1.total_order_amount::numeric
              ELSE ROUND((dps1.total_order_amount * er.rate_to_cny / er_usd.rate_to_cny)::numeric, 2)
            END) AS total_sales,
        SUM(dps1.daily_purchase_quantity)::numeric AS total_quantity
    FROM mv_daily_product_sales AS dps1
    LEFT JOIN tb_sites AS s ON s.site_id = dps1.site_id
    LEFT JOIN tb_exchange_rates AS er ON s.currency = er.currency_symbol AND dps1.order_month = er.exchange_date
    LEFT JOIN tb_exchange_rates AS er_usd ON er_usd.currency_symbol = 'USD' AND dps1.order_month = er_usd.exchange_date
)
SELECT
    dps.product_id,
    dps.site_id,
    '' AS tags,
    SUM(dps.daily_purchase_quantity)::bigint AS total_daily_purchase_quantity,
    SUM(CASE
          WHEN s.currency = 'USD' THEN dps.total_order_amount::numeric
          ELSE ROUND((dps.total_order_amount * er.rate_to_cny / er_usd.rate_to_cny)::numeric, 2)
        END)::float8 AS total_order_amount_usd,
    SUM(dps.total_order_amount)::float8 AS total_order_amount,
    MAX(s.brand) AS site_name,
    MAX(bd.department_name) AS department_name,
    MAX(dps.title) AS product_title,
    MAX(dps.image_url) AS product_img,
    ROUND(SUM(dps.daily_purchase_quantity)::numeric / NULLIF(ts.total_quantity, 0), 8)::text AS quantity_proportion,
    ROUND(SUM(CASE
          WHEN s.currency = 'USD' THEN dps.total_order_amount::numeric
          ELSE ROUND((dps.total_order_amount * er.rate_to_cny / er_usd.rate_to_cny)::numeric, 2)
        END) / NULLIF(ts.total_sales, 0), 8)::text AS sales_percentage
FROM mv_daily_product_sales AS dps
LEFT JOIN tb_sites AS s ON s.site_id = dps.site_id
LEFT JOIN tb_brand_department AS bd ON s.brand_department_id = bd.id
LEFT JOIN tb_exchange_rates AS er ON s.currency = er.currency_symbol AND dps.order_month = er.exchange_date
LEFT JOIN tb_exchange_rates AS er_usd ON er_usd.currency_symbol = 'USD' AND dps.order_month = er_usd.exchange_date
CROSS JOIN total_sales AS ts
{filters}
GROUP BY dps.product_id, dps.site_id, ts.total_sales, ts.total_quantity"#;

// `latest_online_time` is free text; rows that do not hold a timestamp
// never match an online-time bound.
const ONLINE_FROM: &str = "CASE WHEN dps.latest_online_time ~ '^[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}$' \
     THEN dps.latest_online_time::timestamp END >= @online_start_date";
const ONLINE_TO: &str = "CASE WHEN dps.latest_online_time ~ '^[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}$' \
     THEN dps.latest_online_time::timestamp END <= @online_end_date";

static REPORT: Lazy<ReportDef<SpuAnalysisRequest>> = Lazy::new(|| {
    ReportDef::<SpuAnalysisRequest>::new(
        NAME,
        QueryTemplate::new(QUERY)
            .where_region("filters")
            .order_by("total_daily_purchase_quantity DESC"),
    )
    .prepare(validate)
    .filter(FilterDef::and("start_date", "filters", "dps.order_date::date >= @start_date", |r| {
        Ok(optional_date("start_date", r.start_date.as_deref())?.map(|d| vec![Param::date("start_date", d)]))
    }))
    .filter(FilterDef::and("end_date", "filters", "dps.order_date::date <= @end_date", |r| {
        Ok(optional_date("end_date", r.end_date.as_deref())?.map(|d| vec![Param::date("end_date", d)]))
    }))
    .filter(FilterDef::and(
        "online_start_date",
        "filters",
        ONLINE_FROM,
        |r| {
            Ok(optional_timestamp("online_start_date", r.online_start_date.as_deref())?
                .map(|ts| vec![Param::timestamp("online_start_date", ts)]))
        },
    ))
    .filter(FilterDef::and(
        "online_end_date",
        "filters",
        ONLINE_TO,
        |r| {
            Ok(optional_timestamp("online_end_date", r.online_end_date.as_deref())?
                .map(|ts| vec![Param::timestamp("online_end_date", ts)]))
        },
    ))
    .filter(FilterDef::and("site_ids", "filters", "dps.site_id = ANY(@site_ids)", |r| {
        Ok(optional_ids("site_ids", r.site_ids.as_deref())?.map(|ids| vec![Param::int_array("site_ids", ids)]))
    }))
});

fn validate(request: &SpuAnalysisRequest) -> Result<Vec<Param>, salesctl_core::QueryError> {
    let start = optional_date("start_date", request.start_date.as_deref())?;
    let end = optional_date("end_date", request.end_date.as_deref())?;
    optional_range("start_date", start.as_ref(), "end_date", end.as_ref())?;

    let online_start = optional_timestamp("online_start_date", request.online_start_date.as_deref())?;
    let online_end = optional_timestamp("online_end_date", request.online_end_date.as_deref())?;
    optional_range("online_start_date", online_start.as_ref(), "online_end_date", online_end.as_ref())?;

    Ok(Vec::new())
}

impl PaginatedReport for SpuAnalysisRequest {
    fn definition() -> &'static ReportDef<Self> {
        &REPORT
    }
}

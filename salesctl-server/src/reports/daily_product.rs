//! Daily product report: per product and day sales with site and catalogue
//! details.

use once_cell::sync::Lazy;
use serde::Deserialize;

use salesctl_core::{PageParams, Param, QueryTemplate};

use super::inputs::optional_date;
use super::{FilterDef, PaginatedReport, Paged, ReportDef, TotalKey};

pub const NAME: &str = "daily-product-report";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyProductRequest {
    #[serde(flatten)]
    pub page: PageParams,
    pub order_date: Option<String>,
}

impl Paged for DailyProductRequest {
    fn page_params(&self) -> PageParams {
        self.page
    }
}

const QUERY: &str = r#"SELECT
    dps.product_id AS spu,
    dps.order_date,
    dps.daily_purchase_quantity::bigint AS total_purchase_quantity,
    dps.total_order_amount::float8 AS total_order_amount,
    dps.total_original_price::float8 AS total_order_amount_original,
    COALESCE(NULLIF(dps.latest_online_time, ''), '-') AS online_time,
    CASE WHEN position('https' IN dps.link) > 0 THEN dps.link ELSE 'https://' || dps.link END AS link,
    g.main_image AS product_img,
    g.title AS product_title,
    s.brand AS site_name,
    s.site_type,
    bd.department_name,
    '-' AS marketing_expenses,
    '-' AS procurement_ratio,
    '-' AS refund_ratio
FROM vw_daily_product_sales AS dps
LEFT JOIN tb_sites AS s ON dps.site_id = s.site_id
LEFT JOIN tb_brand_department AS bd ON s.brand_department_id = bd.id
LEFT JOIN tb_goods AS g ON dps.product_id = g.p_id
{filters}"#;

static REPORT: Lazy<ReportDef<DailyProductRequest>> = Lazy::new(|| {
    ReportDef::<DailyProductRequest>::new(
        NAME,
        QueryTemplate::new(QUERY)
            .where_region("filters")
            .order_by("order_date DESC, total_order_amount DESC"),
    )
    .filter(FilterDef::and("order_date", "filters", "dps.order_date = @order_date", |r| {
        Ok(optional_date("order_date", r.order_date.as_deref())?
            .map(|d| vec![Param::date("order_date", d)]))
    }))
    .total_key(TotalKey::TotalRecords)
});

impl PaginatedReport for DailyProductRequest {
    fn definition() -> &'static ReportDef<Self> {
        &REPORT
    }
}

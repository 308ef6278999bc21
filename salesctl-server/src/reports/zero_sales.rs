//! Products that have never sold.

use once_cell::sync::Lazy;
use serde::Deserialize;

use salesctl_core::{PageParams, Param, QueryTemplate};

use super::inputs::optional_timestamp;
use super::{FilterDef, PaginatedReport, Paged, ReportDef};

pub const NAME: &str = "get-zero-sales-products";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZeroSalesRequest {
    #[serde(flatten)]
    pub page: PageParams,
    /// Exact creation time, compared to the second
    pub create_time: Option<String>,
}

impl Paged for ZeroSalesRequest {
    fn page_params(&self) -> PageParams {
        self.page
    }
}

const QUERY: &str = r#"SELECT
    p.p_id AS product_id,
    p.title AS product_title,
    p.online_time,
    p.main_image AS product_img,
    p.tags,
    s.brand AS site_name,
    bd.department_name,
    p.create_time
FROM tb_goods AS p
LEFT JOIN mv_sold_products AS sp ON p.p_id = sp.product_id
LEFT JOIN tb_sites AS s ON s.site_id = p.site_id
LEFT JOIN tb_brand_department AS bd ON s.brand_department_id = bd.id
WHERE sp.product_id IS NULL
{filters}"#;

static REPORT: Lazy<ReportDef<ZeroSalesRequest>> = Lazy::new(|| {
    ReportDef::<ZeroSalesRequest>::new(
        NAME,
        QueryTemplate::new(QUERY)
            .continue_region("filters")
            .order_by("online_time DESC"),
    )
    .filter(FilterDef::and(
        "create_time",
        "filters",
        "date_trunc('second', p.create_time) = @create_time",
        |r| {
            Ok(optional_timestamp("create_time", r.create_time.as_deref())?
                .map(|ts| vec![Param::timestamp("create_time", ts)]))
        },
    ))
});

impl PaginatedReport for ZeroSalesRequest {
    fn definition() -> &'static ReportDef<Self> {
        &REPORT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn template_is_consistent() {
        REPORT.template.validate().unwrap();
    }

    #[test]
    fn create_time_extends_the_existing_predicate() {
        let request = ZeroSalesRequest {
            create_time: Some("2024-03-01 10:15:30".into()),
            ..Default::default()
        };
        let query = REPORT.builder(&request).unwrap().build().unwrap();

        assert!(query
            .sql()
            .contains("WHERE sp.product_id IS NULL\nAND date_trunc('second', p.create_time) = @create_time"));
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 15, 30)
            .unwrap();
        assert_eq!(query.params(), &[Param::timestamp("create_time", expected)]);
    }

    #[test]
    fn create_time_is_never_interpolated() {
        let request = ZeroSalesRequest {
            create_time: Some("2024-03-01' OR '1'='1".into()),
            ..Default::default()
        };
        assert!(REPORT.builder(&request).is_err());
    }

    #[test]
    fn without_create_time_every_unsold_product_counts() {
        let query = REPORT.builder(&ZeroSalesRequest::default()).unwrap().build().unwrap();
        assert!(query.params().is_empty());
        assert!(query.sql().ends_with("WHERE sp.product_id IS NULL\n\nORDER BY online_time DESC"));
    }
}

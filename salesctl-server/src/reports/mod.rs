//! Report catalogue
//!
//! Every report is a configuration object rather than a hand-written query
//! function:
//! - paginated reports: a `ReportDef` (template + ordered filter specs)
//!   executed through the window-count paginator
//! - chart reports: fixed-parameter queries whose rows are reshaped
//!
//! `run_named` dispatches by report name with a JSON body, for callers that
//! do not know the request types (the CLI).

pub mod daily_product;
pub mod inputs;
pub mod product_analysis;
pub mod sales_summary;
pub mod sales_trend;
pub mod spu_analysis;
pub mod top_products;
pub mod zero_sales;

use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use salesctl_core::{
    execute_page, Connective, Filter, PageParams, PageRequest, Param, QueryBuilder, QueryError,
    QueryTemplate, Record, Warehouse,
};

/// Names of every report, in catalogue order
pub const REPORT_NAMES: &[&str] = &[
    daily_product::NAME,
    spu_analysis::NAME,
    zero_sales::NAME,
    product_analysis::NAME,
    sales_summary::NAME,
    sales_trend::NAME,
    top_products::NAME,
];

/// Error running a report
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("unknown report '{0}'")]
    UnknownReport(String),

    #[error("no data found for {0}")]
    NoData(&'static str),
}

/// Evaluates one optional input of a request.
///
/// Returns `Ok(None)` when the input is absent.
pub type BindFn<R> = fn(&R) -> Result<Option<Vec<Param>>, QueryError>;

/// Declaration of an optional filter
pub struct FilterDef<R> {
    pub name: &'static str,
    pub region: &'static str,
    pub connective: Connective,
    pub fragment: &'static str,
    pub bind: BindFn<R>,
}

impl<R> FilterDef<R> {
    pub fn and(
        name: &'static str,
        region: &'static str,
        fragment: &'static str,
        bind: BindFn<R>,
    ) -> Self {
        Self {
            name,
            region,
            connective: Connective::And,
            fragment,
            bind,
        }
    }

    /// Turn the definition into a filter if its input is present.
    pub fn evaluate(&self, request: &R) -> Result<Option<Filter>, QueryError> {
        let Some(params) = (self.bind)(request)? else {
            return Ok(None);
        };

        Ok(Some(Filter {
            name: self.name,
            region: self.region,
            connective: self.connective,
            fragment: self.fragment,
            params,
        }))
    }
}

/// Key the total is reported under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalKey {
    Total,
    TotalRecords,
}

impl TotalKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Total => "total",
            Self::TotalRecords => "total_records",
        }
    }
}

/// Cross-field checks and unconditional parameters of a request
pub type PrepareFn<R> = fn(&R) -> Result<Vec<Param>, QueryError>;

/// Per-report configuration
pub struct ReportDef<R> {
    pub name: &'static str,
    pub template: QueryTemplate,
    /// Evaluated in declaration order
    pub filters: Vec<FilterDef<R>>,
    pub prepare: PrepareFn<R>,
    pub total_key: TotalKey,
    /// Return the executed SQL next to the rows
    pub echo_sql: bool,
}

impl<R> ReportDef<R> {
    pub fn new(name: &'static str, template: QueryTemplate) -> Self {
        Self {
            name,
            template,
            filters: Vec::new(),
            prepare: |_| Ok(Vec::new()),
            total_key: TotalKey::Total,
            echo_sql: false,
        }
    }

    pub fn filter(mut self, filter: FilterDef<R>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn prepare(mut self, prepare: PrepareFn<R>) -> Self {
        self.prepare = prepare;
        self
    }

    pub fn total_key(mut self, key: TotalKey) -> Self {
        self.total_key = key;
        self
    }

    pub fn echo_sql(mut self) -> Self {
        self.echo_sql = true;
        self
    }

    /// Validate a request and collect its triggered filters.
    ///
    /// Every input error surfaces here, before anything is executed.
    pub fn builder(&self, request: &R) -> Result<QueryBuilder<'_>, QueryError> {
        let required = (self.prepare)(request)?;

        let mut builder = QueryBuilder::new(&self.template);
        for param in required {
            builder.bind(param)?;
        }
        for filter_def in &self.filters {
            if let Some(filter) = filter_def.evaluate(request)? {
                builder.filter(filter)?;
            }
        }

        Ok(builder)
    }
}

/// Requests that carry pagination fields
pub trait Paged {
    fn page_params(&self) -> PageParams;
}

/// A paginated report: request type bound to its configuration
pub trait PaginatedReport: Paged + DeserializeOwned + Send + Sync + 'static {
    fn definition() -> &'static ReportDef<Self>;
}

/// One page of a report as returned to callers
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse {
    pub total_key: TotalKey,
    pub total: u64,
    pub result: Vec<Record>,
    pub sql_query: Option<String>,
}

impl Serialize for PageResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.sql_query.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry(self.total_key.as_str(), &self.total)?;
        map.serialize_entry("result", &self.result)?;
        if let Some(sql) = &self.sql_query {
            map.serialize_entry("sql_query", sql)?;
        }
        map.end()
    }
}

/// Run a paginated report: one warehouse round trip, total from row 0.
pub async fn run_paginated<R>(warehouse: &dyn Warehouse, request: &R) -> Result<PageResponse, ReportError>
where
    R: PaginatedReport,
{
    let report = R::definition();
    let page = PageRequest::try_from(request.page_params())?;
    let query = report.builder(request)?.build_page(page)?;

    tracing::debug!(report = report.name, page = page.page(), limit = page.limit(), "running report");
    let result = execute_page(warehouse, &query).await?;
    tracing::info!(report = report.name, total = result.total_records, rows = result.rows.len(), "report served");

    Ok(PageResponse {
        total_key: report.total_key,
        total: result.total_records,
        result: result.rows,
        sql_query: report.echo_sql.then(|| query.to_positional()),
    })
}

/// Run any report by name with a JSON request body.
pub async fn run_named(name: &str, warehouse: &dyn Warehouse, body: Value) -> Result<Value, ReportError> {
    match name {
        daily_product::NAME => paginated_json::<daily_product::DailyProductRequest>(warehouse, body).await,
        spu_analysis::NAME => paginated_json::<spu_analysis::SpuAnalysisRequest>(warehouse, body).await,
        zero_sales::NAME => paginated_json::<zero_sales::ZeroSalesRequest>(warehouse, body).await,
        product_analysis::NAME => {
            paginated_json::<product_analysis::ProductAnalysisRequest>(warehouse, body).await
        }
        sales_summary::NAME => to_json(sales_summary::run(warehouse, &parse_body(body)?).await?),
        sales_trend::NAME => to_json(sales_trend::run(warehouse, &parse_body(body)?).await?),
        top_products::NAME => to_json(top_products::run(warehouse, &parse_body(body)?).await?),
        other => Err(ReportError::UnknownReport(other.to_string())),
    }
}

async fn paginated_json<R>(warehouse: &dyn Warehouse, body: Value) -> Result<Value, ReportError>
where
    R: PaginatedReport,
{
    let request: R = parse_body(body)?;
    to_json(run_paginated(warehouse, &request).await?)
}

fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, ReportError> {
    serde_json::from_value(body).map_err(|e| ReportError::InvalidBody(e.to_string()))
}

fn to_json<T: Serialize>(value: T) -> Result<Value, ReportError> {
    serde_json::to_value(value).map_err(|e| ReportError::InvalidBody(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesctl_core::params::{parse_id_list, present};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct SiteRequest {
        #[serde(flatten)]
        page: PageParams,
        site_ids: Option<String>,
    }

    impl Paged for SiteRequest {
        fn page_params(&self) -> PageParams {
            self.page
        }
    }

    fn sites() -> ReportDef<SiteRequest> {
        ReportDef::<SiteRequest>::new(
            "sites",
            QueryTemplate::new("SELECT site_id FROM tb_sites {filters}")
                .where_region("filters")
                .order_by("site_id"),
        )
        .filter(FilterDef::and("site_ids", "filters", "site_id = ANY(@site_ids)", |r| {
            present(r.site_ids.as_deref())
                .map(|raw| parse_id_list("site_ids", raw))
                .transpose()
                .map(|ids| ids.filter(|ids| !ids.is_empty()).map(|ids| vec![Param::int_array("site_ids", ids)]))
        }))
    }

    #[test]
    fn absent_input_adds_no_clause() {
        let request: SiteRequest = serde_json::from_value(json!({})).unwrap();
        let report = sites();
        let builder = report.builder(&request).unwrap();
        assert!(builder.clauses().is_empty());
        assert!(builder.params().is_empty());
    }

    #[test]
    fn blank_input_is_absent() {
        let request: SiteRequest = serde_json::from_value(json!({ "site_ids": " , " })).unwrap();
        let report = sites();
        assert!(report.builder(&request).unwrap().clauses().is_empty());
    }

    #[test]
    fn present_input_binds_parsed_ids() {
        let request: SiteRequest = serde_json::from_value(json!({ "site_ids": "5, 12, 7" })).unwrap();
        let report = sites();
        let builder = report.builder(&request).unwrap();
        assert_eq!(builder.clauses().len(), 1);
        assert_eq!(builder.params(), &[Param::int_array("site_ids", vec![5, 12, 7])]);
    }

    #[test]
    fn page_response_uses_configured_key() {
        let response = PageResponse {
            total_key: TotalKey::TotalRecords,
            total: 3,
            result: vec![],
            sql_query: None,
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "total_records": 3, "result": [] })
        );

        let response = PageResponse {
            total_key: TotalKey::Total,
            sql_query: Some("SELECT 1".into()),
            ..response
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "total": 3, "result": [], "sql_query": "SELECT 1" })
        );
    }
}

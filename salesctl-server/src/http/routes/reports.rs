//! Paginated report endpoints
//!
//! One generic handler serves every paginated report; the request type
//! picks the report configuration.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::http::error::ApiError;
use crate::http::extractors::ApiJson;
use crate::http::server::AppState;
use crate::reports::{
    daily_product::DailyProductRequest, product_analysis::ProductAnalysisRequest, run_paginated,
    spu_analysis::SpuAnalysisRequest, zero_sales::ZeroSalesRequest, PageResponse, PaginatedReport,
    REPORT_NAMES,
};

/// POST /api/{report} - one page of a report
async fn run_report<R>(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<R>,
) -> Result<Json<PageResponse>, ApiError>
where
    R: PaginatedReport,
{
    let response = run_paginated(state.warehouse.as_ref(), &request).await?;
    Ok(Json(response))
}

#[derive(Serialize)]
pub struct ReportList {
    pub reports: &'static [&'static str],
}

/// GET /api/reports - report names
async fn list_reports() -> Json<ReportList> {
    Json(ReportList { reports: REPORT_NAMES })
}

fn path(name: &str) -> String {
    format!("/api/{}", name)
}

/// Paginated report routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reports", get(list_reports))
        .route(
            &path(DailyProductRequest::definition().name),
            post(run_report::<DailyProductRequest>),
        )
        .route(
            &path(SpuAnalysisRequest::definition().name),
            post(run_report::<SpuAnalysisRequest>),
        )
        .route(
            &path(ZeroSalesRequest::definition().name),
            post(run_report::<ZeroSalesRequest>),
        )
        .route(
            &path(ProductAnalysisRequest::definition().name),
            post(run_report::<ProductAnalysisRequest>),
        )
}

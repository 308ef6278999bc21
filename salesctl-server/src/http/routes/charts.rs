//! Chart endpoints: unpaginated reports reshaped for the dashboard

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};

use crate::http::error::ApiError;
use crate::http::extractors::ApiJson;
use crate::http::server::AppState;
use crate::reports::sales_summary::{self, ProductRangeRequest, SummaryResponse};
use crate::reports::sales_trend::{self, TrendResponse};
use crate::reports::top_products::{self, TopProductsRequest, TopProductsResponse};

/// POST /api/product-sales-summary
async fn summary(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ProductRangeRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    Ok(Json(sales_summary::run(state.warehouse.as_ref(), &request).await?))
}

/// POST /api/product-sales-report
async fn trend(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ProductRangeRequest>,
) -> Result<Json<TrendResponse>, ApiError> {
    Ok(Json(sales_trend::run(state.warehouse.as_ref(), &request).await?))
}

/// POST /api/top-products
async fn top(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TopProductsRequest>,
) -> Result<Json<TopProductsResponse>, ApiError> {
    Ok(Json(top_products::run(state.warehouse.as_ref(), &request).await?))
}

/// Chart routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(&format!("/api/{}", sales_summary::NAME), post(summary))
        .route(&format!("/api/{}", sales_trend::NAME), post(trend))
        .route(&format!("/api/{}", top_products::NAME), post(top))
}

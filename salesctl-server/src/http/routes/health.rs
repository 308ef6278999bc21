//! Health check endpoint

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::reports::REPORT_NAMES;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Number of reports the router serves
    pub reports: usize,
}

/// GET /health
///
/// Liveness only; the warehouse is not contacted.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        reports: REPORT_NAMES.len(),
    })
}

/// Health routes
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}

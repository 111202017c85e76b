//! Health check endpoint

use axum::{Extension, Json};
use serde::Serialize;

use crate::analysis::SymptomAnalyzer;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    ai_configured: bool,
}

/// GET /health - Report liveness and whether a completion service is configured
pub async fn check(Extension(analyzer): Extension<SymptomAnalyzer>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        ai_configured: analyzer.ai_configured(),
    })
}

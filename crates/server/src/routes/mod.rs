pub mod analyze;
pub mod health;
pub mod metrics;

use axum::{Router, routing::post};

/// Build API routes
pub fn api_routes() -> Router {
    Router::new().route("/analyze", post(analyze::analyze))
}

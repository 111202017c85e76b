//! whichdoctor-server library crate
//!
//! Exposes `build_app`, the analysis pipeline, and `config` for integration
//! tests. The actual binary entrypoint is in `main.rs`.

pub mod ai;
pub mod analysis;
pub mod config;
mod error;
mod middleware;
mod routes;

use std::any::Any;
use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::DefaultBodyLimit,
    middleware as axum_mw,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use ai::{AiInvoker, GeminiClient, OutboundLimiter, PubMedLookup, RetryPolicy};
use analysis::SymptomAnalyzer;
use config::Config;
use error::AppError;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the analyzer with the Gemini client described by `config`.
/// Without an API key the analyzer has no completion service.
pub fn build_analyzer(config: &Config) -> SymptomAnalyzer {
    let invoker = config.gemini_api_key.as_ref().map(|key| {
        let client = GeminiClient::new(key.clone())
            .with_model(config.gemini_model.clone())
            .with_base_url(config.gemini_base_url.clone());
        let limiter = Arc::new(OutboundLimiter::new(config.max_concurrent_ai_calls));
        AiInvoker::new(Arc::new(client), limiter).with_policy(RetryPolicy {
            base_delay: config.retry_base_delay,
            ..RetryPolicy::default()
        })
    });

    let analyzer = SymptomAnalyzer::new(invoker, config.analysis_timeout);
    if config.enable_pubmed_lookup {
        analyzer.with_resource_lookup(Arc::new(PubMedLookup::new()))
    } else {
        analyzer
    }
}

/// Build the full application router with all routes and middleware.
pub fn build_app(config: &Config) -> Router {
    build_app_with(build_analyzer(config), config)
}

/// Build the router around a prepared analyzer.
///
/// Extracted so integration tests can inject a scripted completion client
/// without binding to a TCP port.
pub fn build_app_with(analyzer: SymptomAnalyzer, config: &Config) -> Router {
    let rate_limiter = middleware::create_rate_limiter(config.rate_limit_rps);

    // Rate-limited analysis routes
    let api_routes = Router::new()
        .nest("/api", routes::api_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum_mw::from_fn(middleware::rate_limit_middleware))
        .layer(Extension(rate_limiter));

    // Install Prometheus metrics recorder.
    // Repeated calls (e.g. in integration tests) keep the first recorder;
    // every handle still renders.
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let prometheus_handle = recorder.handle();
    let _ = metrics::set_global_recorder(recorder);

    let public_routes = Router::new()
        .route("/health", get(routes::health::check))
        .route("/metrics", get(routes::metrics::get))
        .layer(Extension(prometheus_handle));

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(AnyOrigin)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin)
    };

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(Extension(analyzer))
        .layer(axum_mw::from_fn(middleware::audit_middleware))
        .layer(axum_mw::from_fn(middleware::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum_mw::from_fn(middleware::metrics_middleware))
        .layer(CatchPanicLayer::custom(handle_panic))
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    AppError::Internal(detail).into_response()
}

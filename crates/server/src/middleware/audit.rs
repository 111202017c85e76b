//! Audit logging for submissions

use axum::{body::Body, extract::Request, http::Method, middleware::Next, response::Response};

use super::request_id::RequestId;

/// Log each POST with its request id, path, and status. Bodies are never
/// read here, so symptom content stays out of the audit trail.
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let response = next.run(request).await;

    if method == Method::POST {
        let status = response.status().as_u16();

        tracing::info!(
            target: "audit",
            request_id = %request_id,
            path = %uri,
            status = %status,
            "Submission"
        );
    }

    response
}

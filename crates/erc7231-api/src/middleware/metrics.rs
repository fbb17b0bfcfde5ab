//! # HTTP Metrics
//!
//! Records request counts and latency through the `metrics` facade. The
//! Prometheus exporter installed by the binary renders them at `/metrics`;
//! without an installed recorder these calls are no-ops.
//!
//! The path label uses the matched route template (`/v1/tokens/{token_id}/owner`),
//! not the raw URI, to keep label cardinality bounded.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Count and time every request.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    let elapsed = start.elapsed().as_secs_f64();
    let is_error = response.status().is_client_error() || response.status().is_server_error();

    metrics::counter!(
        "erc7231_http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "erc7231_http_request_duration_seconds",
        "method" => method.clone(),
        "path" => path.clone()
    )
    .record(elapsed);
    if is_error {
        metrics::counter!(
            "erc7231_http_errors_total",
            "method" => method,
            "path" => path,
            "status" => status
        )
        .increment(1);
    }

    response
}

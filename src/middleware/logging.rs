//! Request logging middleware.
//!
//! Logs every HTTP request with method, path, status code, and latency.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Middleware that logs HTTP requests with timing information.
///
/// Logs at WARN for 5xx, INFO for 4xx and DEBUG otherwise, since
/// `/client/state` is typically polled by clients at a high rate.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let start = Instant::now();

    let span = tracing::info_span!(
        "http_request",
        method = %method,
        path = %path,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    let response = next.run(request).instrument(span.clone()).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    span.record("status", status);
    span.record("latency_ms", latency.as_millis() as u64);

    if status >= 500 {
        warn!(
            method = %method,
            path = %path,
            status = status,
            latency_ms = latency.as_millis() as u64,
            "Request failed (5xx)"
        );
    } else if status >= 400 {
        info!(
            method = %method,
            path = %path,
            status = status,
            latency_ms = latency.as_millis() as u64,
            "Request completed (4xx)"
        );
    } else {
        debug!(
            method = %method,
            path = %path,
            status = status,
            latency_ms = latency.as_millis() as u64,
            "Request completed"
        );
    }

    response
}

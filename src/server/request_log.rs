//! Request logging middleware — one id, one line in, one line out.

use std::time::Instant;

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::info;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Assign each request a UUID, log method/path on entry and status/latency on
/// exit, and echo the id back in the `x-request-id` response header.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start = Instant::now();

    info!(%request_id, %method, %path, "request received");

    let mut response = next.run(request).await;

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    info!(
        %request_id,
        status = response.status().as_u16(),
        elapsed_ms,
        "request handled"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

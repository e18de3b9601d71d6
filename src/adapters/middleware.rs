//! Axum middleware attached to every route of the site router.
use std::time::Instant;

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Instrument;

use crate::tracing_setup::create_request_span;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Identifier assigned to a request by [`request_id_middleware`], available
/// from the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Log start/end of a request including latency.
pub async fn request_timing_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    tracing::debug!("Started processing {} {} {:?}", method, uri, version);

    let response = next.run(req).await;
    let duration = start.elapsed();

    let span = tracing::Span::current();
    span.record("http.status_code", response.status().as_u16());
    span.record("duration_ms", duration.as_millis() as u64);

    tracing::info!(
        "Completed {} {} {:?} - {} in {:?}",
        method,
        uri,
        version,
        response.status(),
        duration
    );

    response
}

/// Generate a per-request UUID, run the request inside a `request` span
/// carrying it, and echo it as `X-Request-ID`.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = create_request_span(req.method().as_str(), req.uri().path(), &request_id);

    req.extensions_mut().insert(RequestId(request_id.clone()));
    let mut response = next.run(req).instrument(span).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    response
}

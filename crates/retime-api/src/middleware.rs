//! API middleware.

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, Response};
use axum::middleware::Next;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::error::{detail_response, InternalDetail, GENERIC_DETAIL};
use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Scope the request under an `http_request` span carrying its id.
///
/// A client-supplied `X-Request-ID` is reused, otherwise one is generated.
/// The id is echoed back on the response.
pub async fn request_id(request: Request<Body>, next: Next) -> Response<Body> {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = info_span!(
        "http_request",
        request_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Request logging middleware. Runs inside the request span.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let probe = matches!(
        request.uri().path(),
        "/health" | "/healthz" | "/ready" | "/metrics"
    );
    let start = Instant::now();

    let response = next.run(request).await;

    if !probe {
        info!(
            status = %response.status(),
            duration_ms = %start.elapsed().as_millis(),
            "Request completed"
        );
    }
    response
}

/// Replace internal error text with a generic detail in production.
pub async fn hide_internal_errors(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let response = next.run(request).await;

    if state.config.is_production() && response.extensions().get::<InternalDetail>().is_some() {
        return detail_response(response.status(), GENERIC_DETAIL);
    }
    response
}

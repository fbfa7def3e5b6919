use std::time::Duration;

use axum::http::{HeaderName, Request};
use axum::{body::Body, response::Response, Router};
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{field::Empty, Span};

pub fn header() -> HeaderName {
    HeaderName::from_static("x-request-id")
}

#[derive(Clone, Default)]
pub struct MakeReqId;

impl MakeRequestId for MakeReqId {
    fn make_request_id<B>(&mut self, _req: &Request<B>) -> Option<RequestId> {
        // Generate a unique request ID using nanoid
        let id = nanoid::nanoid!();
        Some(RequestId::new(id.parse().ok()?))
    }
}

/// Wrap `router` with request ids (generated unless the client sent one)
/// and one `http_request` span per request.
pub fn with_request_tracing(router: Router) -> Router {
    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            let rid = req
                .headers()
                .get(header())
                .and_then(|v| v.to_str().ok())
                .unwrap_or("n/a");
            tracing::info_span!(
                "http_request",
                method = %req.method(),
                uri = %req.uri().path(),
                version = ?req.version(),
                request_id = %rid,
                status = Empty,
                latency_ms = Empty
            )
        })
        .on_response(|res: &Response, latency: Duration, span: &Span| {
            span.record("status", res.status().as_u16());
            span.record("latency_ms", latency.as_millis() as u64);
            tracing::debug!("request finished");
        });

    router
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(header()))
        .layer(SetRequestIdLayer::new(header(), MakeReqId))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_valid_header_values() {
        let req = Request::builder().body(()).unwrap();
        let id = MakeReqId.make_request_id(&req).unwrap();
        assert_eq!(id.header_value().len(), 21);
    }
}

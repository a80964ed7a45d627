use axum::body::Body;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

type MakeRequestSpan = fn(&http::Request<Body>) -> tracing::Span;

/// Wraps every HTTP request in an `http_request` span. Request and response
/// events are only emitted at trace level.
pub(crate) fn trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, MakeRequestSpan>
{
    TraceLayer::new_for_http()
        .make_span_with(request_span as MakeRequestSpan)
        .on_request(DefaultOnRequest::new().level(Level::TRACE))
        .on_response(DefaultOnResponse::new().level(Level::TRACE))
        .on_failure(DefaultOnFailure::new().level(Level::DEBUG))
}

fn request_span(request: &http::Request<Body>) -> tracing::Span {
    // Set by the request id layer, which runs first.
    let x_request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    tracing::debug_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        x_request_id,
    )
}

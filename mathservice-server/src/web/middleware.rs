use std::any::Any;
use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::error::ApiErrorResponse;

/// Identifies the service and its version in the `Server` response header.
const SERVER: &str = concat!("mathservice/", env!("CARGO_PKG_VERSION"));

/// Sets the `Server` header on every response, replacing any value set by a handler.
pub fn set_server_header() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(header::SERVER, HeaderValue::from_static(SERVER))
}

/// Creates the DEBUG span that wraps the handling of one request.
///
/// Records the peer address when the app is served with connect info.
pub fn make_http_span(request: &Request) -> tracing::Span {
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    tracing::debug_span!(
        "request",
        method = %request.method(),
        path = request.uri().path(),
        version = ?request.version(),
        client_addr = client_addr.map(tracing::field::display),
    )
}

/// Turns a handler panic into a `500` with a generic JSON error body.
///
/// The panic message is logged but never sent to the client. Use with the
/// [`CatchPanicLayer`](tower_http::catch_panic::CatchPanicLayer) middleware.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("no panic message");

    tracing::error!(panic = message, "Handler panicked");
    detail(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Fallback for paths without a route.
pub async fn not_found() -> Response {
    detail(StatusCode::NOT_FOUND)
}

/// Fallback for routed paths that do not support the request method.
pub async fn method_not_allowed() -> Response {
    detail(StatusCode::METHOD_NOT_ALLOWED)
}

/// A JSON error body whose detail is the canonical reason of the status code.
fn detail(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or("Unknown Error");
    (status, Json(ApiErrorResponse::with_detail(reason))).into_response()
}

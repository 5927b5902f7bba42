//! HTTP response builders
//!
//! Builders for the status responses the router and handlers emit, decoupled
//! from specific business logic. Build failures are logged and degrade to an
//! empty 200 response instead of panicking.

use crate::http::body::{empty, full, BoxedBody};
use crate::logger;
use hyper::Response;

/// Build 400 Bad Request response (malformed URI or percent-encoding)
pub fn build_400_response() -> Response<BoxedBody> {
    plain_text(400, "Bad request")
}

/// Build 404 Not Found response (empty body)
pub fn build_404_response() -> Response<BoxedBody> {
    status_only(404)
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<BoxedBody> {
    plain_text(405, "Unsupported request method")
}

/// Build 416 Range Not Satisfiable response
///
/// Empty body and deliberately no Content-Range header.
pub fn build_416_response() -> Response<BoxedBody> {
    status_only(416)
}

/// Build 500 Internal Server Error response (empty body)
pub fn build_500_response() -> Response<BoxedBody> {
    status_only(500)
}

/// Build 501 response for a Range header that failed to parse
pub fn build_bad_range_response() -> Response<BoxedBody> {
    plain_text(501, "Bad range")
}

/// Build 301 redirect response
pub fn build_301_response(location: &str) -> Response<BoxedBody> {
    Response::builder()
        .status(301)
        .header("Location", location)
        .body(full("Redirected"))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(empty())
        })
}

/// Build 302 redirect response
pub fn build_302_response(location: &str) -> Response<BoxedBody> {
    Response::builder()
        .status(302)
        .header("Location", location)
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error("302", &e);
            Response::new(empty())
        })
}

/// Build a JSON response with the given status code
pub fn build_json_response(status: u16, payload: &serde_json::Value) -> Response<BoxedBody> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(full(payload.to_string()))
        .unwrap_or_else(|e| {
            log_build_error("JSON", &e);
            Response::new(empty())
        })
}

/// Build 200 text/html response
pub fn build_html_response(content: String) -> Response<BoxedBody> {
    Response::builder()
        .status(200)
        .header("Content-Type", "text/html")
        .body(full(content))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(empty())
        })
}

fn status_only(status: u16) -> Response<BoxedBody> {
    Response::builder()
        .status(status)
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error("status", &e);
            Response::new(empty())
        })
}

fn plain_text(status: u16, message: &'static str) -> Response<BoxedBody> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(full(message))
        .unwrap_or_else(|e| {
            log_build_error("text", &e);
            Response::new(empty())
        })
}

/// Log response build error
fn log_build_error(kind: &str, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {kind} response: {error}"));
}

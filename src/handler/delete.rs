//! Delete handler
//!
//! Accepts a form-encoded `filename` and delegates removal to the storage
//! backend.

use crate::http::{self, BoxedBody};
use crate::logger;
use crate::server::ServerContext;
use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::{Method, Request, Response};
use serde_json::json;
use url::form_urlencoded;

/// Handle `POST /delete`.
pub async fn handle<B>(req: Request<B>, sctx: &ServerContext) -> Response<BoxedBody>
where
    B: Body + Send,
    B::Data: Send,
    B::Error: std::fmt::Display,
{
    if req.method() != Method::POST {
        return http::build_json_response(405, &json!({ "error": "Method not allowed" }));
    }

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return delete_failed(&format!("{e}")),
    };

    let filename = form_urlencoded::parse(&body)
        .find(|(key, _)| key == "filename")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty());
    let Some(filename) = filename else {
        return http::build_json_response(400, &json!({ "error": "No filename provided" }));
    };

    match sctx.store.remove(&[filename]).await {
        Ok(()) => http::build_json_response(200, &json!({ "success": true })),
        Err(e) => {
            logger::log_error(&format!("Delete error: {e}"));
            delete_failed(&e.to_string())
        }
    }
}

fn delete_failed(message: &str) -> Response<BoxedBody> {
    http::build_json_response(500, &json!({ "error": format!("Delete failed: {message}") }))
}

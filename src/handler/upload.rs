//! Multipart upload pipeline
//!
//! Buffers the request body, extracts the PDF part and its declared filename
//! from the multipart payload, checks the storage backend for a name
//! collision and delegates storage. The body is split on the raw boundary
//! token rather than parsed by a streaming multipart implementation; the
//! header/body separator is the first double-CRLF within the selected part.

use crate::http::{self, BoxedBody};
use crate::logger;
use crate::server::ServerContext;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};
use serde_json::json;

const DEFAULT_FILENAME: &str = "uploaded.pdf";
const UPLOAD_CONTENT_TYPE: &str = "application/pdf";

/// The binary payload and declared filename of an upload.
#[derive(Debug, PartialEq, Eq)]
struct ParsedUpload {
    filename: String,
    payload: Bytes,
}

/// Handle `POST /upload`.
pub async fn handle<B>(req: Request<B>, sctx: &ServerContext) -> Response<BoxedBody>
where
    B: Body + Send,
    B::Data: Send,
    B::Error: std::fmt::Display,
{
    if req.method() != Method::POST {
        return method_not_allowed();
    }

    let boundary = req
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .and_then(|ct| ct.split_once("boundary=").map(|(_, b)| b.to_string()));
    let Some(boundary) = boundary else {
        return no_pdf_response();
    };

    // The full body is buffered before parsing; bounded only by the HTTP
    // layer's own limits.
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return upload_failed(&format!("{e}")),
    };

    let Some(upload) = parse_upload(&body, &boundary) else {
        return no_pdf_response();
    };

    // Check-then-upload is not atomic against a concurrent upload of the
    // same name; the last writer wins inside the race window.
    match sctx.store.find_by_name(&upload.filename).await {
        Ok(existing) if !existing.is_empty() => {
            return http::build_json_response(
                409,
                &json!({ "error": "A file with the same name already exists." }),
            );
        }
        Ok(_) => {}
        Err(e) => {
            logger::log_error(&format!("Upload error: {e}"));
            return upload_failed(&e.to_string());
        }
    }

    match sctx
        .store
        .upload(&upload.filename, upload.payload, UPLOAD_CONTENT_TYPE, true)
        .await
    {
        Ok(()) => http::build_json_response(200, &json!({ "success": true })),
        Err(e) => {
            logger::log_error(&format!("Upload error: {e}"));
            upload_failed(&e.to_string())
        }
    }
}

/// Extract the PDF part's filename and binary payload.
///
/// Part selection is textual: the part whose headers declare
/// `application/pdf` or whose field name is `pdf`. The payload is the byte
/// range between the first double-CRLF and the final CRLF preceding the
/// closing boundary marker.
fn parse_upload(body: &Bytes, boundary: &str) -> Option<ParsedUpload> {
    let marker = format!("--{boundary}");
    let text = String::from_utf8_lossy(body);

    let pdf_part = text.split(marker.as_str()).find(|part| {
        part.contains("Content-Type: application/pdf") || part.contains("name=\"pdf\"")
    })?;

    let filename = extract_filename(pdf_part)
        .unwrap_or(DEFAULT_FILENAME)
        .to_string();

    let headers_end = find_subsequence(body, b"\r\n\r\n")?;
    let payload_start = headers_end + 4;

    let closing = format!("--{boundary}--");
    let closing_start = rfind_subsequence(body, closing.as_bytes())?;
    // Trim the CRLF that separates the payload from the closing boundary.
    let payload_end = closing_start.checked_sub(2)?;
    if payload_end < payload_start {
        return None;
    }

    Some(ParsedUpload {
        filename,
        payload: body.slice(payload_start..payload_end),
    })
}

/// Pull the declared filename out of a `Content-Disposition`-style fragment.
fn extract_filename(part: &str) -> Option<&str> {
    let (_, rest) = part.split_once("filename=\"")?;
    let (filename, _) = rest.split_once('"')?;
    Some(filename)
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn rfind_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

fn method_not_allowed() -> Response<BoxedBody> {
    Response::builder()
        .status(405)
        .body(http::empty())
        .unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build 405 response: {e}"));
            Response::new(http::empty())
        })
}

fn no_pdf_response() -> Response<BoxedBody> {
    http::build_json_response(400, &json!({ "error": "No PDF file found in upload" }))
}

fn upload_failed(message: &str) -> Response<BoxedBody> {
    http::build_json_response(500, &json!({ "error": format!("Upload failed: {message}") }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::test_support::test_context_with_store;
    use crate::storage::memory::MemoryStore;
    use http_body_util::Full;
    use std::sync::Arc;

    const BOUNDARY: &str = "----testboundary";

    fn multipart_body(headers: &str, payload: &[u8]) -> Bytes {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(headers.as_bytes());
        body.extend_from_slice(b"\r\n\r\n");
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Bytes::from(body)
    }

    fn pdf_body(filename: &str, payload: &[u8]) -> Bytes {
        multipart_body(
            &format!(
                "Content-Disposition: form-data; name=\"pdf\"; filename=\"{filename}\"\r\nContent-Type: application/pdf"
            ),
            payload,
        )
    }

    fn upload_request(body: Bytes) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Full::new(body))
            .unwrap()
    }

    async fn body_json(response: Response<BoxedBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_parse_upload_extracts_payload_and_filename() {
        let body = pdf_body("report.pdf", b"%PDF-1.7 binary\x00bytes");
        let upload = parse_upload(&body, BOUNDARY).unwrap();
        assert_eq!(upload.filename, "report.pdf");
        assert_eq!(upload.payload.as_ref(), b"%PDF-1.7 binary\x00bytes");
    }

    #[test]
    fn test_parse_upload_defaults_filename() {
        let body = multipart_body("Content-Type: application/pdf", b"data");
        let upload = parse_upload(&body, BOUNDARY).unwrap();
        assert_eq!(upload.filename, DEFAULT_FILENAME);
    }

    #[test]
    fn test_parse_upload_selects_by_field_name() {
        let body = multipart_body(
            "Content-Disposition: form-data; name=\"pdf\"; filename=\"x.pdf\"",
            b"data",
        );
        assert!(parse_upload(&body, BOUNDARY).is_some());
    }

    #[test]
    fn test_parse_upload_rejects_missing_pdf_part() {
        let body = multipart_body(
            "Content-Disposition: form-data; name=\"other\"\r\nContent-Type: text/plain",
            b"data",
        );
        assert!(parse_upload(&body, BOUNDARY).is_none());
    }

    #[tokio::test]
    async fn test_upload_success() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let sctx = test_context_with_store(dir.path(), store.clone());

        let response = handle(upload_request(pdf_body("new.pdf", b"%PDF")), &sctx).await;
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(response).await["success"], true);
        assert_eq!(store.object("new.pdf").unwrap().as_ref(), b"%PDF");
    }

    #[tokio::test]
    async fn test_upload_name_collision() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_objects(&["taken.pdf"]));
        let sctx = test_context_with_store(dir.path(), store.clone());

        let response = handle(upload_request(pdf_body("taken.pdf", b"%PDF")), &sctx).await;
        assert_eq!(response.status(), 409);
        assert_eq!(
            body_json(response).await["error"],
            "A file with the same name already exists."
        );
        // The stored object is untouched.
        assert!(store.object("taken.pdf").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_non_post() {
        let dir = tempfile::tempdir().unwrap();
        let sctx = test_context_with_store(dir.path(), Arc::new(MemoryStore::new()));
        let request = Request::builder()
            .method(Method::GET)
            .uri("/upload")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = handle(request, &sctx).await;
        assert_eq!(response.status(), 405);
    }

    #[tokio::test]
    async fn test_upload_without_pdf_part_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let sctx = test_context_with_store(dir.path(), Arc::new(MemoryStore::new()));
        let body = multipart_body("Content-Disposition: form-data; name=\"other\"", b"x");

        let response = handle(upload_request(body), &sctx).await;
        assert_eq!(response.status(), 400);
        assert_eq!(
            body_json(response).await["error"],
            "No PDF file found in upload"
        );
    }

    #[tokio::test]
    async fn test_upload_backend_failure_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let sctx = test_context_with_store(dir.path(), store.clone());

        let response = handle(upload_request(pdf_body("x.pdf", b"%PDF")), &sctx).await;
        assert_eq!(response.status(), 500);
        let error = body_json(response).await["error"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(error.starts_with("Upload failed:"), "got: {error}");
    }
}

//! Request routing dispatch
//!
//! Entry point for HTTP request processing: normalizes the request target,
//! special-cases the upload/delete/index routes, runs method hooks and falls
//! through to filesystem resolution and static file serving.

use crate::handler::{delete, index, static_files, upload};
use crate::handler::static_files::ResolvedTarget;
use crate::http::range::RangeParse;
use crate::http::{self, BoxedBody};
use crate::logger;
use crate::server::ServerContext;
use hyper::body::Body;
use hyper::{HeaderMap, Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;
use url::Url;

const INDEX_ROUTE: &str = "/web/pdfs";
const FAVICON_RESOURCE: &str = "/test/resources/favicon.ico";

/// Immutable view of an inbound request, derived once per request.
pub struct RequestContext {
    pub method: Method,
    /// Absolute URL against the configured host/port. Joining the raw target
    /// onto the server base collapses `..` traversal segments, so the raw
    /// path never reaches the filesystem.
    pub url: Url,
    pub range_header: Option<String>,
    pub origin: Option<String>,
    pub verbose: bool,
}

impl RequestContext {
    /// First query parameter value for `name`.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// Main entry point for HTTP request handling.
pub async fn handle_request<B>(
    req: Request<B>,
    sctx: Arc<ServerContext>,
) -> Result<Response<BoxedBody>, Infallible>
where
    B: Body + Send,
    B::Data: Send,
    B::Error: std::fmt::Display,
{
    // Normalize the target into an absolute URL before anything touches it.
    let Ok(url) = sctx.base_url.join(&req.uri().to_string()) else {
        return Ok(http::build_400_response());
    };

    if sctx.verbose() {
        logger::log_request(req.method(), &url);
    }

    // Upload and delete are dispatched before hook processing; the handlers
    // own their method validation.
    match url.path() {
        "/upload" => return Ok(upload::handle(req, &sctx).await),
        "/delete" => return Ok(delete::handle(req, &sctx).await),
        _ => {}
    }

    let mut ctx = RequestContext {
        method: req.method().clone(),
        url,
        range_header: header_string(req.headers(), "range"),
        origin: header_string(req.headers(), "origin"),
        verbose: sctx.verbose(),
    };

    // Only methods with a hook list are supported at all.
    if sctx.hooks.for_method(&ctx.method).is_none() {
        return Ok(http::build_405_response());
    }
    let mut annotations = HeaderMap::new();
    if let Some(mut response) = sctx.hooks.run(&ctx.method, &ctx, &mut annotations) {
        apply_annotations(&mut response, &annotations);
        return Ok(response);
    }

    if ctx.url.path() == "/favicon.ico" {
        ctx.url.set_path(FAVICON_RESOURCE);
    }

    let mut response = check_request(&ctx, &sctx).await;
    apply_annotations(&mut response, &annotations);
    Ok(response)
}

/// Resolve the request against special routes and the local filesystem.
async fn check_request(ctx: &RequestContext, sctx: &ServerContext) -> Response<BoxedBody> {
    let path = ctx.url.path();

    // The index route works without a matching local directory.
    if path == INDEX_ROUTE {
        return redirect_adding_slash(ctx);
    }
    if path == format!("{INDEX_ROUTE}/") {
        return index::render(sctx).await;
    }

    match static_files::resolve(&sctx.root, path).await {
        ResolvedTarget::BadRequest => http::build_400_response(),
        ResolvedTarget::NotFound => {
            if ctx.verbose {
                logger::log_not_found(&ctx.url);
            }
            http::build_404_response()
        }
        ResolvedTarget::StatFailed => http::build_500_response(),
        ResolvedTarget::Directory => {
            if path.ends_with('/') {
                index::render(sctx).await
            } else {
                redirect_adding_slash(ctx)
            }
        }
        ResolvedTarget::File { path, size } => serve_file(ctx, sctx, &path, size).await,
    }
}

/// Dispatch a regular file to range or full-file serving.
async fn serve_file(
    ctx: &RequestContext,
    sctx: &ServerContext,
    path: &std::path::Path,
    size: u64,
) -> Response<BoxedBody> {
    let range_header = ctx
        .range_header
        .as_deref()
        .filter(|_| !sctx.config.server.disable_range_requests);

    if let Some(raw) = range_header {
        return match http::parse_range_header(Some(raw), size) {
            RangeParse::Parsed(range) => {
                if ctx.verbose {
                    logger::log_range(&ctx.url, range.start, range.end_exclusive);
                }
                static_files::serve_range(ctx, path, size, range).await
            }
            RangeParse::NotPresent | RangeParse::Malformed => {
                if ctx.verbose {
                    logger::log_bad_range(&ctx.url, raw);
                }
                http::build_bad_range_response()
            }
        };
    }

    if ctx.verbose {
        logger::log_serve(&ctx.url);
    }
    static_files::serve_full(sctx, path, size).await
}

/// 301 to the trailing-slash form of the path, preserving the query string.
fn redirect_adding_slash(ctx: &RequestContext) -> Response<BoxedBody> {
    let query = ctx
        .url
        .query()
        .map(|q| format!("?{q}"))
        .unwrap_or_default();
    http::build_301_response(&format!("{}/{query}", ctx.url.path()))
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

/// Merge hook annotations into the outgoing response.
fn apply_annotations(response: &mut Response<BoxedBody>, annotations: &HeaderMap) {
    for (name, value) in annotations {
        response.headers_mut().insert(name.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::test_support::{test_context, test_context_with_store};
    use crate::server::ServerContext;
    use crate::storage::memory::MemoryStore;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Bytes;
    use std::path::Path;
    use std::sync::Arc;

    fn get(target: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::GET)
            .uri(target)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn get_with_range(target: &str, range: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::GET)
            .uri(target)
            .header("range", range)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn dispatch(
        sctx: &Arc<ServerContext>,
        req: Request<Full<Bytes>>,
    ) -> Response<BoxedBody> {
        handle_request(req, Arc::clone(sctx)).await.unwrap()
    }

    async fn body_bytes(response: Response<BoxedBody>) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    fn write_file(dir: &Path, name: &str, contents: &[u8]) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    fn context(root: &Path) -> Arc<ServerContext> {
        Arc::new(test_context(root))
    }

    #[tokio::test]
    async fn test_full_file_serving() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "doc.pdf", b"0123456789");
        let sctx = context(dir.path());

        let response = dispatch(&sctx, get("/doc.pdf")).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers().get("Content-Length").unwrap(), "10");
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "application/pdf"
        );
        assert_eq!(body_bytes(response).await, b"0123456789");
    }

    #[tokio::test]
    async fn test_range_request_matrix() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "data.bin", b"0123456789");
        let sctx = context(dir.path());

        // Valid S-E: 206, Content-Length = E-S+1, body = bytes [S, E].
        let response = dispatch(&sctx, get_with_range("/data.bin", "bytes=3-7")).await;
        assert_eq!(response.status(), 206);
        assert_eq!(response.headers().get("Content-Length").unwrap(), "5");
        assert_eq!(
            response.headers().get("Content-Range").unwrap(),
            "bytes 3-7/10"
        );
        assert_eq!(body_bytes(response).await, b"34567");

        // Open-ended range.
        let response = dispatch(&sctx, get_with_range("/data.bin", "bytes=8-")).await;
        assert_eq!(response.status(), 206);
        assert_eq!(body_bytes(response).await, b"89");

        // E >= size: 416, empty body, no Content-Range.
        let response = dispatch(&sctx, get_with_range("/data.bin", "bytes=0-10")).await;
        assert_eq!(response.status(), 416);
        assert!(response.headers().get("Content-Range").is_none());
        assert!(body_bytes(response).await.is_empty());

        // S > E: 416.
        let response = dispatch(&sctx, get_with_range("/data.bin", "bytes=7-3")).await;
        assert_eq!(response.status(), 416);

        // Malformed: 501 "Bad range".
        let response = dispatch(&sctx, get_with_range("/data.bin", "bytes=x-y")).await;
        assert_eq!(response.status(), 501);
        assert_eq!(body_bytes(response).await, b"Bad range");
    }

    #[tokio::test]
    async fn test_open_range_on_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "empty.bin", b"");
        let sctx = context(dir.path());

        let response = dispatch(&sctx, get_with_range("/empty.bin", "bytes=0-")).await;
        assert_eq!(response.status(), 206);
        assert_eq!(response.headers().get("Content-Length").unwrap(), "0");
        assert_eq!(
            response.headers().get("Content-Range").unwrap(),
            "bytes 0--1/0"
        );
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_range_support_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "data.bin", b"0123456789");
        let mut inner = test_context(dir.path());
        inner.config.server.disable_range_requests = true;
        let sctx = Arc::new(inner);

        let response = dispatch(&sctx, get_with_range("/data.bin", "bytes=3-7")).await;
        assert_eq!(response.status(), 200);
        assert!(response.headers().get("Accept-Ranges").is_none());
        assert_eq!(body_bytes(response).await, b"0123456789");
    }

    #[tokio::test]
    async fn test_not_found_and_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let sctx = context(dir.path());

        let response = dispatch(&sctx, get("/missing.pdf")).await;
        assert_eq!(response.status(), 404);
        assert!(body_bytes(response).await.is_empty());

        let response = dispatch(&sctx, get("/%ff%fe")).await;
        assert_eq!(response.status(), 400);
        assert_eq!(body_bytes(response).await, b"Bad request");
    }

    #[tokio::test]
    async fn test_traversal_never_escapes_root() {
        let dir = tempfile::tempdir().unwrap();
        let sctx = context(dir.path());

        let response = dispatch(&sctx, get("/../../../../etc/passwd")).await;
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_directory_redirect_preserves_query() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let sctx = context(dir.path());

        let response = dispatch(&sctx, get("/sub?a=1")).await;
        assert_eq!(response.status(), 301);
        assert_eq!(response.headers().get("Location").unwrap(), "/sub/?a=1");
    }

    #[tokio::test]
    async fn test_index_route_redirect_and_render() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_objects(&["report.pdf"]));
        let sctx = Arc::new(test_context_with_store(dir.path(), store));

        let response = dispatch(&sctx, get("/web/pdfs?x=1")).await;
        assert_eq!(response.status(), 301);
        assert_eq!(
            response.headers().get("Location").unwrap(),
            "/web/pdfs/?x=1"
        );

        let response = dispatch(&sctx, get("/web/pdfs/")).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers().get("Content-Type").unwrap(), "text/html");
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("report.pdf"));
    }

    #[tokio::test]
    async fn test_index_degrades_on_backend_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let sctx = Arc::new(test_context_with_store(dir.path(), store));

        let response = dispatch(&sctx, get("/web/pdfs/")).await;
        assert_eq!(response.status(), 200);
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("No files found"));
    }

    #[tokio::test]
    async fn test_favicon_remap() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("test/resources")).unwrap();
        write_file(&dir.path().join("test/resources"), "favicon.ico", b"icon");
        let sctx = context(dir.path());

        let response = dispatch(&sctx, get("/favicon.ico")).await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "image/x-icon"
        );
    }

    #[tokio::test]
    async fn test_unsupported_method_is_405() {
        let dir = tempfile::tempdir().unwrap();
        let sctx = context(dir.path());
        let request = Request::builder()
            .method(Method::PUT)
            .uri("/doc.pdf")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = dispatch(&sctx, request).await;
        assert_eq!(response.status(), 405);
        assert_eq!(body_bytes(response).await, b"Unsupported request method");
    }

    #[tokio::test]
    async fn test_cross_origin_annotations_reach_the_response() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("test/pdfs")).unwrap();
        write_file(&dir.path().join("test/pdfs"), "basicapi.pdf", b"%PDF");
        let sctx = context(dir.path());

        let request = Request::builder()
            .method(Method::GET)
            .uri("/test/pdfs/basicapi.pdf?cors=withCredentials")
            .header("origin", "http://example.org")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = dispatch(&sctx, request).await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-credentials")
                .unwrap(),
            "true"
        );
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://example.org"
        );

        // Without the cors flag no CORS headers are added.
        let response = dispatch(&sctx, get("/test/pdfs/basicapi.pdf")).await;
        assert!(response
            .headers()
            .get("access-control-allow-origin")
            .is_none());
    }

    #[tokio::test]
    async fn test_redirect_hook_through_router() {
        let dir = tempfile::tempdir().unwrap();
        let sctx = context(dir.path());

        let response = dispatch(&sctx, get("/doc.pdf?redirectToHost=example.com")).await;
        assert_eq!(response.status(), 302);
        let location = response.headers().get("Location").unwrap().to_str().unwrap();
        assert!(location.starts_with("http://example.com"));
        assert!(!location.contains("redirectToHost"));
        assert_eq!(
            response.headers().get("cache-control").unwrap(),
            "no-store,max-age=0"
        );
    }

    #[tokio::test]
    async fn test_upload_and_delete_routes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_objects(&["old.pdf"]));
        let sctx = Arc::new(test_context_with_store(dir.path(), store.clone()));

        let boundary = "----router";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"pdf\"; filename=\"new.pdf\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n%PDF\r\n");
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Full::new(Bytes::from(body)))
            .unwrap();
        let response = dispatch(&sctx, request).await;
        assert_eq!(response.status(), 200);
        assert!(store.contains("new.pdf"));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/delete")
            .body(Full::new(Bytes::from("filename=old.pdf")))
            .unwrap();
        let response = dispatch(&sctx, request).await;
        assert_eq!(response.status(), 200);
        assert!(!store.contains("old.pdf"));
    }
}

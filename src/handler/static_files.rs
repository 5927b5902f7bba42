//! Static file serving
//!
//! Resolves normalized request paths to locations under the configured root
//! and streams files back whole or as a byte range, without buffering whole
//! files in memory.

use crate::handler::router::RequestContext;
use crate::http::range::ByteRange;
use crate::http::{self, mime, BoxedBody};
use crate::logger;
use crate::server::ServerContext;
use chrono::Utc;
use hyper::Response;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncSeekExt, SeekFrom};

/// Query parameter driving the header-corruption switches used by
/// protocol-conformance test fixtures.
const BREAK_RANGES_PARAM: &str = "test-network-break-ranges";

/// Result of resolving a request path against the local filesystem.
#[derive(Debug)]
pub enum ResolvedTarget {
    /// Percent-encoding in the path could not be decoded.
    BadRequest,
    NotFound,
    /// The path exists but its properties could not be read.
    StatFailed,
    Directory,
    File { path: PathBuf, size: u64 },
}

/// Resolve a normalized, still percent-encoded URL path under `root`.
///
/// Dot segments were already collapsed during URL normalization; on top of
/// that the canonicalized result must stay inside the canonicalized root, so
/// encoded traversal sequences surface as 404 rather than escaping.
pub async fn resolve(root: &Path, encoded_path: &str) -> ResolvedTarget {
    let Ok(decoded) = percent_decode_str(encoded_path).decode_utf8() else {
        return ResolvedTarget::BadRequest;
    };

    let local = root.join(decoded.trim_start_matches('/'));
    let Ok(canonical) = fs::canonicalize(&local).await else {
        return ResolvedTarget::NotFound;
    };

    let Ok(root_canonical) = fs::canonicalize(root).await else {
        logger::log_error(&format!(
            "Serving root not accessible: {}",
            root.display()
        ));
        return ResolvedTarget::StatFailed;
    };
    if !canonical.starts_with(&root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {encoded_path} -> {}",
            canonical.display()
        ));
        return ResolvedTarget::NotFound;
    }

    let Ok(metadata) = fs::metadata(&canonical).await else {
        return ResolvedTarget::StatFailed;
    };
    if metadata.is_dir() {
        ResolvedTarget::Directory
    } else {
        ResolvedTarget::File {
            path: canonical,
            size: metadata.len(),
        }
    }
}

/// Serve a whole file: status 200 with a streamed body.
pub async fn serve_full(
    sctx: &ServerContext,
    path: &Path,
    size: u64,
) -> Response<BoxedBody> {
    let file = match fs::File::open(path).await {
        Ok(file) => file,
        Err(e) => {
            logger::log_error(&format!("Failed to open {}: {e}", path.display()));
            return http::build_500_response();
        }
    };

    let mut builder = Response::builder().status(200);
    if !sctx.config.server.disable_range_requests {
        builder = builder.header("Accept-Ranges", "bytes");
    }
    builder = builder
        .header("Content-Type", mime::content_type_for(path))
        .header("Content-Length", size);
    if let Some(expires) = expires_header(sctx.config.server.cache_expiration_seconds) {
        builder = builder.header("Expires", expires);
    }

    builder
        .body(http::body::stream(file))
        .unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build file response: {e}"));
            http::build_500_response()
        })
}

/// Serve a byte range: status 206 with a streamed body.
///
/// The range is validated here; an unsatisfiable range yields 416 with an
/// empty body and no Content-Range header.
pub async fn serve_range(
    rctx: &RequestContext,
    path: &Path,
    size: u64,
    range: ByteRange,
) -> Response<BoxedBody> {
    if !range.is_satisfiable(size) {
        return http::build_416_response();
    }

    let mut file = match fs::File::open(path).await {
        Ok(file) => file,
        Err(e) => {
            logger::log_error(&format!("Failed to open {}: {e}", path.display()));
            return http::build_500_response();
        }
    };
    if let Err(e) = file.seek(SeekFrom::Start(range.start)).await {
        logger::log_error(&format!("Failed to seek {}: {e}", path.display()));
        return http::build_500_response();
    }
    let reader = tokio::io::AsyncReadExt::take(file, range.len());

    let mut builder = Response::builder()
        .status(206)
        .header("Accept-Ranges", "bytes")
        .header("Content-Type", mime::content_type_for(path))
        .header("Content-Length", range.len());

    // Header-corruption switches for client-robustness test fixtures: either
    // omit Content-Range entirely or emit a syntactically invalid value.
    match rctx.query(BREAK_RANGES_PARAM).as_deref() {
        Some("missing") => {}
        Some("invalid") => {
            builder = builder.header("Content-Range", "bytes abc-def/qwerty");
        }
        _ => {
            // The inclusive end degenerates to -1 for a zero-length range,
            // e.g. `bytes=0-` against an empty file.
            let content_range = match range.end_exclusive.checked_sub(1) {
                Some(last) => format!("bytes {}-{last}/{size}", range.start),
                None => format!("bytes {}--1/{size}", range.start),
            };
            builder = builder.header("Content-Range", content_range);
        }
    }

    builder
        .body(http::body::stream(reader))
        .unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build range response: {e}"));
            http::build_500_response()
        })
}

/// `Expires` value for the configured TTL; `None` when the TTL is 0.
fn expires_header(ttl_seconds: u64) -> Option<String> {
    if ttl_seconds == 0 {
        return None;
    }
    let expire_time = Utc::now() + chrono::Duration::seconds(ttl_seconds.try_into().ok()?);
    Some(expire_time.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

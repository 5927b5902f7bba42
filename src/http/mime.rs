//! MIME type resolution
//!
//! Maps the lower-cased file extension to a content type. Total function:
//! unknown extensions fall back to `application/octet-stream`.

use std::path::Path;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Get the Content-Type for a file path based on its extension.
///
/// The extension is the substring after the last `.` of the final path
/// segment, compared case-insensitively.
pub fn content_type_for(path: &Path) -> &'static str {
    let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
        return DEFAULT_MIME_TYPE;
    };

    match extension.to_ascii_lowercase().as_str() {
        "css" => "text/css",
        "html" => "text/html",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "xhtml" => "application/xhtml+xml",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "png" => "image/png",
        "log" | "ftl" => "text/plain",
        "wasm" => "application/wasm",
        _ => DEFAULT_MIME_TYPE,
    }
}

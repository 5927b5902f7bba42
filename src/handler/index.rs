//! Directory index page
//!
//! Renders a browsable HTML listing of the remote storage bucket with an
//! upload form and per-entry delete controls. A backend listing failure is
//! logged and degrades to an empty list rather than failing the page.
//!
//! Entry names originate from upload filenames and are attacker-controlled,
//! so every interpolation is HTML-escaped.

use crate::http::{self, BoxedBody};
use crate::logger;
use crate::server::ServerContext;
use crate::storage::{ObjectStore, RemoteEntry};
use chrono::Utc;
use hyper::Response;
use std::fmt::Write;
use url::form_urlencoded;
use url::Url;

/// Listing page size; entries beyond the first page are not shown.
const LISTING_LIMIT: usize = 100;

const PAGE_HEADER: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Document Library</title>
  <style>
    body {
      font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
      background-color: #f0f2f5;
      color: #333;
      margin: 0;
      padding: 20px;
    }
    h1 { color: #0056b3; }
    .upload-form {
      margin: 20px 0;
      padding: 15px;
      background: #fff;
      border-radius: 8px;
      box-shadow: 0 2px 4px rgba(0, 0, 0, 0.1);
    }
    .upload-form input[type="file"] { margin-right: 10px; }
    .file-list { margin: 20px 0; }
    .file-item {
      display: flex;
      align-items: center;
      margin: 10px 0;
      padding: 10px;
      background: #fff;
      border-radius: 8px;
      box-shadow: 0 2px 4px rgba(0, 0, 0, 0.1);
    }
    .file-item a {
      color: #0056b3;
      text-decoration: none;
      font-weight: bold;
      flex-grow: 1;
    }
    .file-item a:hover { text-decoration: underline; }
    .delete-button {
      margin-left: auto;
      background-color: #0056b3;
      color: white;
      border: none;
      padding: 8px 12px;
      border-radius: 4px;
      cursor: pointer;
    }
    .delete-button:hover { background-color: #004494; }
    #uploadMessage { color: red; margin-top: 10px; }
  </style>
</head>
<body>
<h1>Document Library</h1>
<div class="upload-form">
  <form id="uploadForm" action="/upload" method="post" enctype="multipart/form-data">
    <input type="file" name="pdf" accept=".pdf" required>
    <input type="submit" value="Upload PDF">
  </form>
  <div id="uploadMessage"></div>
</div>
<script>
  document.getElementById('uploadForm').onsubmit = async function(event) {
    event.preventDefault();
    const formData = new FormData(this);
    const response = await fetch('/upload', { method: 'POST', body: formData });
    const result = await response.json();
    const messageDiv = document.getElementById('uploadMessage');
    if (result.error) {
      messageDiv.textContent = result.error;
    } else {
      messageDiv.textContent = '';
      location.reload();
    }
  };
</script>
"#;

const PAGE_FOOTER: &str = r#"<script>
  async function deleteFile(filename) {
    if (!confirm('Delete ' + filename + '?')) {
      return;
    }
    try {
      const response = await fetch('/delete', {
        method: 'POST',
        headers: { 'Content-Type': 'application/x-www-form-urlencoded' },
        body: new URLSearchParams({ filename })
      });
      if (!response.ok) {
        const data = await response.json();
        throw new Error(data.error || 'Delete failed');
      }
      location.reload();
    } catch (error) {
      alert(error.message);
    }
  }
</script>
</body></html>"#;

/// Render the index page from the remote listing.
pub async fn render(sctx: &ServerContext) -> Response<BoxedBody> {
    let entries = match sctx.store.list("", LISTING_LIMIT, 0).await {
        Ok(entries) => entries,
        Err(e) => {
            logger::log_error(&format!("Error listing files: {e}"));
            Vec::new()
        }
    };

    http::build_html_response(build_page(&entries, sctx.store.as_ref()))
}

/// Assemble the page HTML for the given entries.
fn build_page(entries: &[RemoteEntry], store: &dyn ObjectStore) -> String {
    let mut page = String::from(PAGE_HEADER);
    page.push_str("<div class=\"file-list\">\n");

    for entry in entries {
        let escaped_name = escape_html(&entry.name);
        let viewer = viewer_link(store, entry);
        let _ = write!(
            page,
            r#"<div class="file-item">
  <a href="{viewer}" target="_blank">{escaped_name}</a>
  <button onclick="deleteFile('{escaped_name}')" class="delete-button">Delete</button>
</div>
"#,
        );
    }

    page.push_str("</div>\n");
    if entries.is_empty() {
        page.push_str("<p>No files found</p>\n");
    }
    page.push_str(PAGE_FOOTER);
    page
}

/// Viewer route carrying the entry's public URL, cache-busted with the
/// entry's last-modified timestamp (or the current time when unknown).
fn viewer_link(store: &dyn ObjectStore, entry: &RemoteEntry) -> String {
    let bust = entry.updated_at.map_or_else(
        || Utc::now().timestamp_millis().to_string(),
        |t| t.to_rfc3339(),
    );

    let public = store.public_url(&entry.name);
    let public = match Url::parse(&public) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("v", &bust);
            url.to_string()
        }
        // A public URL the backend produced that does not parse is served
        // without cache busting.
        Err(_) => public,
    };

    let encoded: String = form_urlencoded::byte_serialize(public.as_bytes()).collect();
    format!("/web/viewer.html?file={encoded}&disableRange=true")
}

/// Escape `& < > " '` for interpolation into HTML.
fn escape_html(untrusted: &str) -> String {
    let mut escaped = String::with_capacity(untrusted.len());
    for c in untrusted.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<img src=x onerror='alert("1")'>&co"#),
            "&lt;img src=x onerror=&#39;alert(&quot;1&quot;)&#39;&gt;&amp;co"
        );
        assert_eq!(escape_html("plain.pdf"), "plain.pdf");
    }

    #[test]
    fn test_page_escapes_entry_names() {
        let store = MemoryStore::new();
        let entries = vec![RemoteEntry {
            name: "<script>x</script>.pdf".to_string(),
            updated_at: None,
        }];
        let page = build_page(&entries, &store);
        assert!(!page.contains("<script>x</script>.pdf"));
        assert!(page.contains("&lt;script&gt;x&lt;/script&gt;.pdf"));
    }

    #[test]
    fn test_page_lists_entries_with_viewer_links() {
        let store = MemoryStore::new();
        let entries = vec![RemoteEntry {
            name: "report.pdf".to_string(),
            updated_at: Some("2026-01-02T03:04:05Z".parse().unwrap()),
        }];
        let page = build_page(&entries, &store);
        assert!(page.contains("/web/viewer.html?file="));
        assert!(page.contains("disableRange=true"));
        // The public URL is percent-encoded into the viewer query.
        assert!(page.contains("report.pdf"));
        assert!(page.contains("https%3A%2F%2Fstorage.example.test"));
        assert!(!page.contains("No files found"));
    }

    #[test]
    fn test_empty_listing_placeholder() {
        let store = MemoryStore::new();
        let page = build_page(&[], &store);
        assert!(page.contains("No files found"));
        assert!(page.contains("uploadForm"));
        assert!(page.contains("deleteFile"));
    }
}

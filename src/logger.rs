use crate::config::Config;
use hyper::Method;
use std::net::SocketAddr;
use url::Url;

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    println!("======================================");
    println!("Server running at http://{addr}/");
    println!("Serving root: {}", config.server.root);
    println!("Storage bucket: {}", config.storage.bucket);
    if config.server.disable_range_requests {
        println!("Range requests: disabled");
    }
    if config.logging.verbose {
        println!("Verbose logging enabled");
    }
    println!("Using Tokio runtime for concurrency");
    println!("======================================\n");
}

pub fn log_request(method: &Method, url: &Url) {
    println!("[Request] {method} {url}");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    eprintln!("[ERROR] Failed to serve connection: {err:?}");
}

pub fn log_error(message: &str) {
    eprintln!("[ERROR] {message}");
}

pub fn log_warning(message: &str) {
    eprintln!("[WARN] {message}");
}

// Verbose-only diagnostics. They never change response behavior.

pub fn log_not_found(url: &Url) {
    eprintln!("{url}: not found");
}

pub fn log_bad_range(url: &Url, raw: &str) {
    eprintln!("{url}: bad range: {raw}");
}

pub fn log_range(url: &Url, start: u64, end_exclusive: u64) {
    println!("{url}: range {start}-{end_exclusive}");
}

pub fn log_serve(url: &Url) {
    println!("{url}");
}

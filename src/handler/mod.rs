//! Request handling module
//!
//! Routing, method hooks and the route handlers.

pub mod delete;
pub mod hooks;
pub mod index;
pub mod router;
pub mod static_files;
pub mod upload;

pub use router::handle_request;

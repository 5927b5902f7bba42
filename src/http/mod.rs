//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from specific
//! business logic: body types, MIME resolution, Range parsing and response
//! builders.

pub mod body;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use body::{empty, full, BoxedBody};
pub use range::parse_range_header;
pub use response::{
    build_301_response, build_302_response, build_400_response, build_404_response,
    build_405_response, build_416_response, build_500_response, build_bad_range_response,
    build_html_response, build_json_response,
};

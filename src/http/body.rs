//! Response body construction
//!
//! All responses share one boxed body type so routing code can mix buffered
//! bodies (error pages, JSON, HTML) with streamed file contents.

use futures_util::StreamExt;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

/// Unified response body type.
pub type BoxedBody = BoxBody<Bytes, std::io::Error>;

/// Buffered body from in-memory data.
pub fn full(data: impl Into<Bytes>) -> BoxedBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Empty body.
pub fn empty() -> BoxedBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

/// Streamed body reading from `reader` in chunks, never buffering the whole
/// content in memory.
pub fn stream(reader: impl AsyncRead + Send + Sync + 'static) -> BoxedBody {
    let frames = ReaderStream::new(reader).map(|chunk| chunk.map(Frame::data));
    // StreamBody is both a Body and a Stream, so `.boxed()` is ambiguous here.
    BodyExt::boxed(StreamBody::new(frames))
}

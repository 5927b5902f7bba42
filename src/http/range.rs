//! HTTP Range header parsing
//!
//! Parses a `Range` header into a byte interval against a known total size.
//! Only single ranges of the form `bytes=<start>-<end>?` are supported; the
//! first range-looking prefix wins and anything after it is ignored, so a
//! multi-range header like `bytes=0-9,20-29` parses as `0-9`.

/// A validated-by-the-caller byte interval.
///
/// Invariant once accepted: `0 <= start <= end_exclusive <= total size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end_exclusive: u64,
}

impl ByteRange {
    /// Whether the range fits inside a resource of `total_size` bytes.
    ///
    /// Callers must reject unsatisfiable ranges with 416 (empty body, no
    /// Content-Range header).
    #[must_use]
    pub const fn is_satisfiable(&self, total_size: u64) -> bool {
        self.end_exclusive <= total_size && self.start <= self.end_exclusive
    }

    /// Number of bytes covered by the range.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end_exclusive - self.start
    }
}

/// Range header parse result.
#[derive(Debug)]
pub enum RangeParse {
    /// No Range header on the request; the caller serves the full file.
    NotPresent,
    /// Header present but does not match `bytes=<start>-<end>?`; the caller
    /// responds 501 "Bad range".
    Malformed,
    /// A range prefix was matched.
    Parsed(ByteRange),
}

/// Parse an HTTP Range header against a known total size.
///
/// An absent end position means "until end of file". The returned range is
/// not yet validated against `total_size`; see [`ByteRange::is_satisfiable`].
pub fn parse_range_header(header: Option<&str>, total_size: u64) -> RangeParse {
    let Some(header) = header else {
        return RangeParse::NotPresent;
    };
    let Some(spec) = header.strip_prefix("bytes=") else {
        return RangeParse::Malformed;
    };

    let (start, rest) = match take_digits(spec) {
        Some(parsed) => parsed,
        None => return RangeParse::Malformed,
    };
    let Some(rest) = rest.strip_prefix('-') else {
        return RangeParse::Malformed;
    };

    // An explicit end is inclusive on the wire; anything after the digits
    // (e.g. a second range) is ignored.
    let end_exclusive = match take_digits(rest) {
        Some((end, _)) => end.saturating_add(1),
        None => total_size,
    };

    RangeParse::Parsed(ByteRange {
        start,
        end_exclusive,
    })
}

/// Parse a leading run of ASCII digits, returning the value and the rest.
fn take_digits(s: &str) -> Option<(u64, &str)> {
    let digits_len = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let value = s[..digits_len].parse().ok()?;
    Some((value, &s[digits_len..]))
}

//! Single-range parsing for `Range: bytes=...` headers.
//!
//! Only one range is honored; multi-range requests and anything malformed
//! are rejected so the caller can answer 416. Forms:
//!
//! - `bytes=S-E` - explicit span, `E` clamped to the last byte
//! - `bytes=S-`  - from `S` to the end
//! - `bytes=-N`  - the last `N` bytes; `N >= size` means the whole object

use sledgate_core::codec::trim_and_collapse_ws;

/// An inclusive byte span within an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset.
    pub start: i64,
    /// Last byte offset (inclusive).
    pub end: i64,
}

/// Parse a single-range header against an object of `size` bytes.
///
/// Returns `None` for anything unsatisfiable or malformed.
#[must_use]
pub fn parse_single_range(header_value: &str, size: i64) -> Option<ByteRange> {
    if size <= 0 {
        return None;
    }
    let normalized = trim_and_collapse_ws(header_value);
    let v = normalized.strip_prefix("bytes=")?;
    if v.contains(',') {
        return None;
    }

    let (left, right) = v.split_once('-')?;

    if left.is_empty() {
        // bytes=-N: the last N bytes.
        let suffix: i64 = right.parse().ok()?;
        if suffix <= 0 {
            return None;
        }
        if suffix >= size {
            return Some(ByteRange {
                start: 0,
                end: size - 1,
            });
        }
        return Some(ByteRange {
            start: size - suffix,
            end: size - 1,
        });
    }

    let start: i64 = left.parse().ok()?;
    let end: i64 = if right.is_empty() {
        size - 1
    } else {
        right.parse().ok()?
    };

    if start < 0 || start >= size {
        return None;
    }
    if end < start {
        return None;
    }
    Some(ByteRange {
        start,
        end: end.min(size - 1),
    })
}

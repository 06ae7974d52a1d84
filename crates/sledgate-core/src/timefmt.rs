//! Timestamp formatting for response headers and listing XML.
//!
//! Object mtimes are stored as Unix epoch seconds; the wire wants two
//! renderings of them: RFC 1123 GMT for `Last-Modified` headers and
//! ISO-8601 UTC with a zero millisecond field for XML timestamp nodes.

use chrono::{DateTime, Utc};

/// Current Unix time in whole seconds.
#[must_use]
pub fn unix_now_seconds() -> i64 {
    Utc::now().timestamp()
}

/// Render epoch seconds as an RFC 1123 GMT date, e.g.
/// `Thu, 01 Jan 1970 00:00:00 GMT`.
#[must_use]
pub fn rfc1123_gmt(epoch_seconds: i64) -> String {
    datetime(epoch_seconds)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Render epoch seconds as ISO-8601 UTC with a zero millisecond field, e.g.
/// `1970-01-01T00:00:00.000Z`.
#[must_use]
pub fn iso8601_gmt(epoch_seconds: i64) -> String {
    datetime(epoch_seconds)
        .format("%Y-%m-%dT%H:%M:%S.000Z")
        .to_string()
}

fn datetime(epoch_seconds: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(epoch_seconds, 0).unwrap_or_default()
}

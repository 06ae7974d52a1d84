//! Request-target parsing and bucket/key resolution.
//!
//! Virtual-host style wins when a suffix is configured and the Host header
//! matches `<bucket>.<suffix>` (with any port stripped and a dot required
//! at the boundary); the whole path then becomes the key. Otherwise the
//! first path segment is the bucket and the remainder is the key, both
//! percent-decoded.

use http::request::Parts;

use sledgate_core::codec::{parse_query, percent_decode};

/// A resolved request target.
#[derive(Debug, Clone, Default)]
pub struct ParsedTarget {
    /// Resolved bucket name; empty at the service root.
    pub bucket: String,
    /// Resolved (decoded) object key; empty for bucket-level requests.
    pub key: String,
    /// The raw request path, used as the `Resource` in error envelopes.
    pub path: String,
    /// Decoded query parameters in request order.
    pub query_params: Vec<(String, String)>,
}

impl ParsedTarget {
    /// First value of a query parameter, if present.
    #[must_use]
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse the request target, resolving the bucket from the Host header when
/// `virtual_host_suffix` is configured and matches.
#[must_use]
pub fn parse_target(parts: &Parts, virtual_host_suffix: &str) -> ParsedTarget {
    let path = match parts.uri.path() {
        "" => "/",
        p => p,
    };
    let query = parts.uri.query().unwrap_or("");

    let mut target = ParsedTarget {
        path: path.to_owned(),
        query_params: parse_query(query),
        ..ParsedTarget::default()
    };

    let host = parts
        .headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if let Some(bucket) = bucket_from_host(host, virtual_host_suffix) {
        target.bucket = bucket;
        let key_enc = path.strip_prefix('/').unwrap_or(path);
        target.key = decode_component(key_enc);
        return target;
    }

    let p = path.strip_prefix('/').unwrap_or(path);
    if p.is_empty() {
        return target;
    }

    match p.split_once('/') {
        Some((bucket_enc, key_enc)) => {
            target.bucket = decode_component(bucket_enc);
            target.key = decode_component(key_enc);
        }
        None => {
            target.bucket = decode_component(p);
        }
    }
    target
}

/// Extract `<bucket>` from a Host of the form `<bucket>.<suffix>[:port]`.
fn bucket_from_host(host: &str, suffix: &str) -> Option<String> {
    if suffix.is_empty() {
        return None;
    }
    let host = host.split(':').next().unwrap_or(host);
    let bucket = host.strip_suffix(suffix)?.strip_suffix('.')?;
    if bucket.is_empty() {
        return None;
    }
    Some(bucket.to_owned())
}

/// Percent-decode a path component, falling back to the raw text when the
/// encoding is malformed.
fn decode_component(s: &str) -> String {
    percent_decode(s).unwrap_or_else(|| s.to_owned())
}

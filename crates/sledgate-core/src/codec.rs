//! Percent encoding, query-string handling, and header-value normalization.
//!
//! The encode side follows RFC 3986: unreserved characters (`A-Z`, `a-z`,
//! `0-9`, `-`, `.`, `_`, `~`) pass through, everything else becomes `%HH`
//! with uppercase hex. A flag controls whether `/` is escaped, because URI
//! paths keep their slashes while query components do not.
//!
//! The decode side is strict: a dangling `%` or a non-hex digit is an error,
//! not a pass-through. Callers that want lenient behavior (query parsing)
//! fall back to the raw text themselves.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters escaped in URI paths: everything outside the RFC 3986
/// unreserved set, with `/` passed through.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Characters escaped in query components: the unreserved set only, so `/`
/// is escaped too.
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode `input`, escaping `/` only when `encode_slash` is set.
#[must_use]
pub fn percent_encode(input: &str, encode_slash: bool) -> String {
    let set = if encode_slash {
        COMPONENT_ENCODE_SET
    } else {
        PATH_ENCODE_SET
    };
    utf8_percent_encode(input, set).to_string()
}

/// Percent-decode `input`.
///
/// Returns `None` on a dangling `%` or a non-hex digit. Decoded bytes that
/// are not valid UTF-8 are replaced lossily, matching how request paths are
/// normalized elsewhere in the gateway.
#[must_use]
pub fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' {
            if i + 2 >= bytes.len() {
                return None;
            }
            let hi = hex_value(bytes[i + 1])?;
            let lo = hex_value(bytes[i + 2])?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(b);
            i += 1;
        }
    }
    Some(String::from_utf8_lossy(&out).into_owned())
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(10 + (c - b'a')),
        b'A'..=b'F' => Some(10 + (c - b'A')),
        _ => None,
    }
}

/// Parse a raw query string into decoded `(key, value)` pairs, preserving
/// request order.
///
/// Pairs that fail percent-decoding keep their raw text; a pair without `=`
/// gets an empty value.
#[must_use]
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    if query.is_empty() {
        return Vec::new();
    }

    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (k, v) = part.split_once('=').unwrap_or((part, ""));
            let key = percent_decode(k).unwrap_or_else(|| k.to_owned());
            let value = percent_decode(v).unwrap_or_else(|| v.to_owned());
            (key, value)
        })
        .collect()
}

/// Build the canonical query string from decoded pairs: sort by
/// `(key, value)`, optionally drop one named key, re-encode each side with
/// `/` escaped, and join with `&`.
///
/// The excluded key is how presigned verification removes `X-Amz-Signature`
/// before recomputing the signature.
#[must_use]
pub fn canonical_query_string(
    params: &[(String, String)],
    exclude_key: Option<&str>,
) -> String {
    let mut pairs: Vec<&(String, String)> = params
        .iter()
        .filter(|(k, _)| exclude_key != Some(k.as_str()))
        .collect();
    pairs.sort_unstable_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k, true), percent_encode(v, true)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Trim leading/trailing whitespace and collapse internal runs to a single
/// space (the SigV4 header-value normalization rule).
#[must_use]
pub fn trim_and_collapse_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for ch in s.trim().chars() {
        if ch.is_whitespace() {
            if !in_ws {
                out.push(' ');
                in_ws = true;
            }
        } else {
            out.push(ch);
            in_ws = false;
        }
    }
    out
}

/// Base64-encode with the standard alphabet. Used for opaque continuation
/// tokens only.
#[must_use]
pub fn base64_encode(input: &[u8]) -> String {
    BASE64_STANDARD.encode(input)
}

/// Base64-decode with the standard alphabet.
#[must_use]
pub fn base64_decode(input: &str) -> Option<Vec<u8>> {
    BASE64_STANDARD.decode(input).ok()
}

//! Canonical request construction.
//!
//! The canonical request is the normalized text whose SHA-256 goes into the
//! string to sign:
//!
//! ```text
//! HTTPMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Header names stay in the order the client listed them in `SignedHeaders`;
//! a listed header that is absent from the request is skipped rather than
//! failing the whole request, which keeps the canonical text identical to
//! what the client computed.

use http::HeaderMap;

use sledgate_core::codec::{
    canonical_query_string, percent_decode, percent_encode, trim_and_collapse_ws,
};

/// Canonical URI: decode then re-encode the path with `/` preserved, so an
/// already percent-encoded path normalizes instead of double-encoding. An
/// undecodable path is re-encoded as-is. The empty path canonicalizes to `/`.
#[must_use]
pub fn canonical_uri(path: &str) -> String {
    let path = if path.is_empty() { "/" } else { path };
    match percent_decode(path) {
        Some(decoded) => percent_encode(&decoded, false),
        None => percent_encode(path, false),
    }
}

/// Canonical headers block plus the joined `SignedHeaders` value.
///
/// For each name in `signed_headers` (already lowercased, client order):
/// `name:trimmed-and-collapsed-value\n`. Returns the concatenated block and
/// the `;`-joined names of the headers actually included.
#[must_use]
pub fn canonical_headers(headers: &HeaderMap, signed_headers: &[String]) -> (String, String) {
    let mut block = String::new();
    let mut joined = String::new();

    for name in signed_headers {
        let Some(value) = headers.get(name.as_str()).and_then(|v| v.to_str().ok()) else {
            continue;
        };
        block.push_str(name);
        block.push(':');
        block.push_str(&trim_and_collapse_ws(value));
        block.push('\n');

        if !joined.is_empty() {
            joined.push(';');
        }
        joined.push_str(name);
    }

    (block, joined)
}

/// Assemble the full canonical request.
///
/// `query_params` are the decoded pairs of the request's query string;
/// `exclude_query_key` removes one key before canonicalization (used to drop
/// `X-Amz-Signature` when verifying presigned URLs).
#[must_use]
pub fn build_canonical_request(
    method: &str,
    path: &str,
    query_params: &[(String, String)],
    headers: &HeaderMap,
    signed_headers: &[String],
    payload_hash: &str,
    exclude_query_key: Option<&str>,
) -> String {
    let uri = canonical_uri(path);
    let query = canonical_query_string(query_params, exclude_query_key);
    let (header_block, signed_joined) = canonical_headers(headers, signed_headers);

    format!("{method}\n{uri}\n{query}\n{header_block}\n{signed_joined}\n{payload_hash}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                http::header::HeaderName::from_bytes(name.as_bytes()).expect("header name"),
                value.parse().expect("header value"),
            );
        }
        map
    }

    #[test]
    fn test_should_canonicalize_empty_path_to_slash() {
        assert_eq!(canonical_uri(""), "/");
        assert_eq!(canonical_uri("/"), "/");
    }

    #[test]
    fn test_should_normalize_already_encoded_path() {
        assert_eq!(canonical_uri("/hello%20world"), "/hello%20world");
        assert_eq!(canonical_uri("/hello world"), "/hello%20world");
        assert_eq!(canonical_uri("/a/b/c"), "/a/b/c");
    }

    #[test]
    fn test_should_build_canonical_headers_in_presented_order() {
        let map = headers(&[
            ("host", "bucket.example.com"),
            ("x-amz-date", "20240101T000000Z"),
        ]);
        let signed = vec!["host".to_owned(), "x-amz-date".to_owned()];
        let (block, joined) = canonical_headers(&map, &signed);
        assert_eq!(block, "host:bucket.example.com\nx-amz-date:20240101T000000Z\n");
        assert_eq!(joined, "host;x-amz-date");
    }

    #[test]
    fn test_should_skip_missing_signed_headers() {
        let map = headers(&[("host", "example.com")]);
        let signed = vec!["host".to_owned(), "x-amz-absent".to_owned()];
        let (block, joined) = canonical_headers(&map, &signed);
        assert_eq!(block, "host:example.com\n");
        assert_eq!(joined, "host");
    }

    #[test]
    fn test_should_collapse_header_whitespace() {
        let map = headers(&[("x-custom", "  a   b  ")]);
        let signed = vec!["x-custom".to_owned()];
        let (block, _) = canonical_headers(&map, &signed);
        assert_eq!(block, "x-custom:a b\n");
    }

    #[test]
    fn test_should_match_aws_get_object_canonical_request() {
        use sha2::{Digest, Sha256};

        let map = headers(&[
            ("host", "examplebucket.s3.amazonaws.com"),
            ("range", "bytes=0-9"),
            (
                "x-amz-content-sha256",
                "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            ),
            ("x-amz-date", "20130524T000000Z"),
        ]);
        let signed: Vec<String> = ["host", "range", "x-amz-content-sha256", "x-amz-date"]
            .iter()
            .map(|s| (*s).to_owned())
            .collect();

        let canonical = build_canonical_request(
            "GET",
            "/test.txt",
            &[],
            &map,
            &signed,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            None,
        );

        // AWS SigV4 test vector from the S3 API reference.
        let hash = hex::encode(Sha256::digest(canonical.as_bytes()));
        assert_eq!(
            hash,
            "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972"
        );
    }
}

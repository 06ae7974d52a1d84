//! End-to-end scenarios for the sledgate gateway and prefix cache.
//!
//! The gateway tests drive [`sledgate_api::Api`] in-process over a
//! temporary sled database; the cache end-to-end test additionally boots
//! the full HTTP server on an ephemeral port and talks to it through the
//! gateway-backed storage client.

use bytes::Bytes;
use http::Response;

use sledgate_api::{Api, ApiConfig};
use sledgate_store::ObjectStore;

/// A fresh API over a throwaway database. Keep the directory alive for as
/// long as the API is in use.
#[must_use]
pub fn test_api(config: ApiConfig) -> (Api, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = sled::Config::new()
        .path(dir.path())
        .temporary(true)
        .open()
        .expect("open sled");
    (Api::new(ObjectStore::new(db), config), dir)
}

/// Drive one request through the API.
#[must_use]
pub fn send(
    api: &Api,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: &[u8],
) -> Response<Bytes> {
    let mut builder = http::Request::builder()
        .method(method)
        .uri(uri)
        .header("Host", "localhost:9000");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let (parts, ()) = builder.body(()).expect("request").into_parts();
    api.handle(&parts, &Bytes::copy_from_slice(body))
}

/// A response header as a string.
#[must_use]
pub fn header<'a>(res: &'a Response<Bytes>, name: &str) -> Option<&'a str> {
    res.headers().get(name).and_then(|v| v.to_str().ok())
}

/// The text between `<tag>` and the next `<` in an XML body.
#[must_use]
pub fn xml_text(body: &str, tag: &str) -> Option<String> {
    body.split(&format!("<{tag}>"))
        .nth(1)
        .and_then(|rest| rest.split('<').next())
        .map(str::to_owned)
}

mod test_cache;
mod test_gateway;
mod test_sigv4;

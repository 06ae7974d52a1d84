//! The request dispatcher: auth, routing, and response construction.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use http::request::Parts;
use http::{Method, Response, StatusCode};
use tracing::{debug, warn};

use sledgate_auth::{AuthError, AuthMode, Credentials, verify};
use sledgate_core::timefmt::{rfc1123_gmt, unix_now_seconds};
use sledgate_store::{ObjectStore, StoreError};

use crate::range::parse_single_range;
use crate::target::{ParsedTarget, parse_target};
use crate::xml;

/// Product token carried in the `Server` header of every response.
const SERVER_NAME: &str = "sledgate";

const OCTET_STREAM: &str = "application/octet-stream";

/// Protocol-level configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// How requests are authenticated.
    pub auth_mode: AuthMode,
    /// Key pair checked in SigV4 mode.
    pub credentials: Credentials,
    /// Host suffix enabling `bucket.<suffix>` addressing; empty disables it.
    pub virtual_host_suffix: String,
    /// Maximum accepted PUT body, in bytes.
    pub max_object_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            auth_mode: AuthMode::None,
            credentials: Credentials::default(),
            virtual_host_suffix: String::new(),
            max_object_bytes: 64 * 1024 * 1024,
        }
    }
}

/// The S3 API over an object store.
///
/// `handle` is synchronous: storage and signature verification run inline
/// on the calling task, and the whole request/response pair is buffered.
pub struct Api {
    store: ObjectStore,
    config: ApiConfig,
    next_request_id: AtomicU64,
}

impl Api {
    /// Create the API over `store`.
    #[must_use]
    pub fn new(store: ObjectStore, config: ApiConfig) -> Self {
        Self {
            store,
            config,
            next_request_id: AtomicU64::new(1),
        }
    }

    /// Handle one request.
    pub fn handle(&self, parts: &Parts, body: &Bytes) -> Response<Bytes> {
        let request_id = self.request_id();
        let resource = parts
            .uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str())
            .to_owned();

        // Auth runs before routing.
        if let Err(err) = verify(parts, body, self.config.auth_mode, &self.config.credentials) {
            warn!(%err, resource, request_id, "rejected request authentication");
            let (status, code) = map_auth_error(&err);
            return error_response(status, code, &err.to_string(), &resource, &request_id);
        }

        // Size guard for object writes.
        if parts.method == Method::PUT && body.len() > self.config.max_object_bytes {
            return error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "EntityTooLarge",
                "Object too large",
                &resource,
                &request_id,
            );
        }

        let target = parse_target(parts, &self.config.virtual_host_suffix);
        debug!(
            method = %parts.method,
            bucket = %target.bucket,
            key = %target.key,
            request_id,
            "dispatching request"
        );

        if target.bucket.is_empty() {
            self.handle_service(parts, &target, &request_id)
        } else if target.key.is_empty() {
            self.handle_bucket(parts, &target, &request_id)
        } else {
            self.handle_object(parts, body, &target, &request_id)
        }
    }

    fn request_id(&self) -> String {
        format!("{:x}", self.next_request_id.fetch_add(1, Ordering::Relaxed))
    }

    /// The 413 envelope for a request whose body was refused before it was
    /// fully read. The session loop uses this when its read-side body limit
    /// trips, so the refusal carries a request id like any other error.
    pub fn entity_too_large(&self, parts: &Parts) -> Response<Bytes> {
        let resource = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
        error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            "EntityTooLarge",
            "Object too large",
            resource,
            &self.request_id(),
        )
    }

    /// `GET /` lists buckets; nothing else is valid at the service root.
    fn handle_service(
        &self,
        parts: &Parts,
        target: &ParsedTarget,
        request_id: &str,
    ) -> Response<Bytes> {
        if parts.method != Method::GET {
            return method_not_allowed(&target.path, request_id);
        }

        match self.store.list_buckets() {
            Ok(buckets) => xml_response(
                StatusCode::OK,
                xml::list_buckets_xml(&buckets, unix_now_seconds()),
            ),
            Err(err) => store_error_response(&err, &target.path, request_id),
        }
    }

    fn handle_bucket(
        &self,
        parts: &Parts,
        target: &ParsedTarget,
        request_id: &str,
    ) -> Response<Bytes> {
        match parts.method {
            Method::PUT => match self.store.create_bucket(&target.bucket) {
                Ok(()) => empty_response(StatusCode::OK),
                Err(err) => store_error_response(&err, &target.path, request_id),
            },

            Method::HEAD => match self.store.bucket_exists(&target.bucket) {
                Ok(true) => empty_response(StatusCode::OK),
                Ok(false) => error_response(
                    StatusCode::NOT_FOUND,
                    "NoSuchBucket",
                    "The specified bucket does not exist",
                    &target.path,
                    request_id,
                ),
                Err(err) => store_error_response(&err, &target.path, request_id),
            },

            Method::DELETE => match self.store.delete_bucket(&target.bucket) {
                Ok(()) => empty_response(StatusCode::NO_CONTENT),
                Err(err) => store_error_response(&err, &target.path, request_id),
            },

            Method::GET => self.handle_list_objects(target, request_id),

            _ => method_not_allowed(&target.path, request_id),
        }
    }

    fn handle_list_objects(&self, target: &ParsedTarget, request_id: &str) -> Response<Bytes> {
        let prefix = target.query("prefix").unwrap_or("");
        let max_keys = target
            .query("max-keys")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(1000);
        let token = target.query("continuation-token").unwrap_or("");

        match self
            .store
            .list_objects_v2(&target.bucket, prefix, max_keys, token)
        {
            Ok(result) => xml_response(
                StatusCode::OK,
                xml::list_bucket_result_xml(&target.bucket, prefix, max_keys, token, &result),
            ),
            Err(err) => store_error_response(&err, &target.path, request_id),
        }
    }

    fn handle_object(
        &self,
        parts: &Parts,
        body: &Bytes,
        target: &ParsedTarget,
        request_id: &str,
    ) -> Response<Bytes> {
        match parts.method {
            Method::PUT => {
                let content_type = parts
                    .headers
                    .get(http::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or(OCTET_STREAM);

                match self
                    .store
                    .put_object(&target.bucket, &target.key, body, content_type)
                {
                    Ok(meta) => response_builder(StatusCode::OK)
                        .header("ETag", format!("\"{}\"", meta.etag))
                        .body(Bytes::new())
                        .expect("static response"),
                    Err(err) => store_error_response(&err, &target.path, request_id),
                }
            }

            Method::GET => self.handle_get_object(parts, target, request_id),

            Method::HEAD => match self.store.head_object(&target.bucket, &target.key) {
                Ok(meta) => object_headers(response_builder(StatusCode::OK), &meta)
                    .header(http::header::CONTENT_LENGTH, meta.size)
                    .body(Bytes::new())
                    .expect("static response"),
                Err(err) => store_error_response(&err, &target.path, request_id),
            },

            Method::DELETE => match self.store.delete_object(&target.bucket, &target.key) {
                Ok(()) => empty_response(StatusCode::NO_CONTENT),
                Err(err) => store_error_response(&err, &target.path, request_id),
            },

            _ => method_not_allowed(&target.path, request_id),
        }
    }

    fn handle_get_object(
        &self,
        parts: &Parts,
        target: &ParsedTarget,
        request_id: &str,
    ) -> Response<Bytes> {
        let (data, meta) = match self.store.get_object(&target.bucket, &target.key) {
            Ok(pair) => pair,
            Err(err) => return store_error_response(&err, &target.path, request_id),
        };

        let size = data.len() as i64;
        let range_header = parts
            .headers
            .get(http::header::RANGE)
            .and_then(|v| v.to_str().ok());

        let range = match range_header {
            None => None,
            Some(value) => match parse_single_range(value, size) {
                Some(range) => Some(range),
                None => {
                    let mut res = error_response(
                        StatusCode::RANGE_NOT_SATISFIABLE,
                        "InvalidRange",
                        "The requested range is not satisfiable",
                        &target.path,
                        request_id,
                    );
                    if let Ok(hv) = format!("bytes */{size}").parse() {
                        res.headers_mut().insert(http::header::CONTENT_RANGE, hv);
                    }
                    return res;
                }
            },
        };

        let status = if range.is_some() {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        };
        let mut builder = object_headers(response_builder(status), &meta);

        let body = match range {
            Some(r) => {
                builder = builder.header(
                    http::header::CONTENT_RANGE,
                    format!("bytes {}-{}/{size}", r.start, r.end),
                );
                Bytes::copy_from_slice(&data[r.start as usize..=r.end as usize])
            }
            None => Bytes::from(data),
        };

        builder.body(body).expect("static response")
    }
}

/// Builder with the headers every response carries.
fn response_builder(status: StatusCode) -> http::response::Builder {
    Response::builder()
        .status(status)
        .header(http::header::SERVER, SERVER_NAME)
}

/// Metadata headers shared by object GET and HEAD responses.
fn object_headers(
    builder: http::response::Builder,
    meta: &sledgate_store::ObjectMeta,
) -> http::response::Builder {
    let content_type = if meta.content_type.is_empty() {
        OCTET_STREAM
    } else {
        &meta.content_type
    };
    builder
        .header(http::header::CONTENT_TYPE, content_type)
        .header("ETag", format!("\"{}\"", meta.etag))
        .header(http::header::LAST_MODIFIED, rfc1123_gmt(meta.mtime))
        .header(http::header::ACCEPT_RANGES, "bytes")
}

fn xml_response(status: StatusCode, body: Vec<u8>) -> Response<Bytes> {
    response_builder(status)
        .header(http::header::CONTENT_TYPE, "application/xml")
        .body(Bytes::from(body))
        .expect("static response")
}

fn empty_response(status: StatusCode) -> Response<Bytes> {
    response_builder(status)
        .body(Bytes::new())
        .expect("static response")
}

/// Render the `<Error>` envelope with the gateway's standard headers.
fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    resource: &str,
    request_id: &str,
) -> Response<Bytes> {
    xml_response(status, xml::error_xml(code, message, resource, request_id))
}

fn method_not_allowed(resource: &str, request_id: &str) -> Response<Bytes> {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "MethodNotAllowed",
        "Unsupported method",
        resource,
        request_id,
    )
}

fn store_error_response(err: &StoreError, resource: &str, request_id: &str) -> Response<Bytes> {
    let (status, code) = map_store_error(err);
    error_response(status, code, &err.to_string(), resource, request_id)
}

/// Total mapping from storage errors to HTTP status and S3 error code.
fn map_store_error(err: &StoreError) -> (StatusCode, &'static str) {
    match err {
        StoreError::NoSuchBucket => (StatusCode::NOT_FOUND, "NoSuchBucket"),
        StoreError::NoSuchKey => (StatusCode::NOT_FOUND, "NoSuchKey"),
        StoreError::BucketNotEmpty => (StatusCode::CONFLICT, "BucketNotEmpty"),
        StoreError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "InvalidRequest"),
        StoreError::CorruptMetadata | StoreError::Kv(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "InternalError")
        }
    }
}

/// Total mapping from verification failures to HTTP status and S3 error code.
fn map_auth_error(err: &AuthError) -> (StatusCode, &'static str) {
    match err {
        AuthError::MissingAuthentication => (StatusCode::FORBIDDEN, "AccessDenied"),
        AuthError::SignatureDoesNotMatch => (StatusCode::FORBIDDEN, "SignatureDoesNotMatch"),
        AuthError::InvalidScope => (StatusCode::FORBIDDEN, "InvalidRequest"),
        AuthError::StreamingNotImplemented => (StatusCode::NOT_IMPLEMENTED, "NotImplemented"),
    }
}

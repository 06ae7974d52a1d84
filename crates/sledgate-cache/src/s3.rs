//! Gateway-backed storage: objects live in a bucket on a running
//! S3-compatible gateway, addressed by their content hash.
//!
//! Plain unauthenticated HTTP with per-request timeouts; a transport
//! failure surfaces as a storage error and the index treats it as a miss.

use async_trait::async_trait;
use tracing::debug;

use crate::error::CacheError;
use crate::storage::CacheStorage;

/// Connection settings for the gateway.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Base URL, e.g. `http://127.0.0.1:9000`.
    pub endpoint: String,
    /// Bucket holding the cache objects.
    pub bucket: String,
    /// Total per-request timeout.
    pub timeout_ms: u64,
    /// Connect timeout.
    pub connect_timeout_ms: u64,
    /// Verify TLS certificates.
    pub verify_tls: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            bucket: "prompt-cache".to_owned(),
            timeout_ms: 5000,
            connect_timeout_ms: 2000,
            verify_tls: true,
        }
    }
}

/// HTTP client for one bucket on one gateway.
pub struct S3Storage {
    client: reqwest::Client,
    config: S3Config,
}

impl S3Storage {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: S3Config) -> Result<Self, CacheError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .connect_timeout(std::time::Duration::from_millis(config.connect_timeout_ms))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;
        Ok(Self { client, config })
    }

    /// Create the configured bucket (idempotent on the gateway side).
    pub async fn create_bucket(&self) -> Result<(), CacheError> {
        let status = self
            .client
            .put(self.bucket_url())
            .send()
            .await?
            .status();
        if status.as_u16() == 200 || status.as_u16() == 204 {
            Ok(())
        } else {
            Err(CacheError::BackendStatus {
                status: status.as_u16(),
            })
        }
    }

    fn bucket_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket
        )
    }

    fn object_url(&self, obj_id: &str) -> String {
        format!("{}/{obj_id}", self.bucket_url())
    }
}

#[async_trait]
impl CacheStorage for S3Storage {
    async fn put(&self, obj_id: &str, data: &[u8]) -> Result<(), CacheError> {
        let status = self
            .client
            .put(self.object_url(obj_id))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await?
            .status();
        if status.is_success() {
            Ok(())
        } else {
            Err(CacheError::BackendStatus {
                status: status.as_u16(),
            })
        }
    }

    async fn get_range(&self, obj_id: &str, max_bytes: usize) -> Result<Vec<u8>, CacheError> {
        let mut request = self.client.get(self.object_url(obj_id));
        if max_bytes > 0 {
            request = request.header(
                reqwest::header::RANGE,
                format!("bytes=0-{}", max_bytes - 1),
            );
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        match status {
            200 | 206 => Ok(response.bytes().await?.to_vec()),
            404 => Err(CacheError::NotFound {
                obj_id: obj_id.to_owned(),
            }),
            _ => Err(CacheError::BackendStatus { status }),
        }
    }

    async fn delete(&self, obj_id: &str) -> Result<(), CacheError> {
        let status = self
            .client
            .delete(self.object_url(obj_id))
            .send()
            .await?
            .status();
        if status.is_success() {
            Ok(())
        } else {
            debug!(obj_id, status = status.as_u16(), "delete refused");
            Err(CacheError::BackendStatus {
                status: status.as_u16(),
            })
        }
    }

    fn size(&self) -> usize {
        // The gateway is not asked to count; the figure is advisory.
        0
    }
}

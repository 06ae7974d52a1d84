//! Object metadata and its on-disk codec.
//!
//! Encoded form: `size \0 mtime \0 etag \0 content_type`, numbers as ASCII
//! decimal. Decoding requires exactly three separators before the
//! content-type tail; anything less is corrupt.

use crate::error::StoreError;

/// Metadata stored alongside every object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Exact body length in bytes.
    pub size: i64,
    /// Unix epoch seconds at write time.
    pub mtime: i64,
    /// Lowercase hex MD5 of the body.
    pub etag: String,
    /// MIME type, defaulting to `application/octet-stream`.
    pub content_type: String,
}

impl ObjectMeta {
    /// Serialize to the `\0`-separated on-disk form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.etag.len() + self.content_type.len());
        out.extend_from_slice(self.size.to_string().as_bytes());
        out.push(0);
        out.extend_from_slice(self.mtime.to_string().as_bytes());
        out.push(0);
        out.extend_from_slice(self.etag.as_bytes());
        out.push(0);
        out.extend_from_slice(self.content_type.as_bytes());
        out
    }

    /// Parse the `\0`-separated on-disk form.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptMetadata`] when a separator is missing
    /// or a numeric field does not parse.
    pub fn decode(value: &[u8]) -> Result<Self, StoreError> {
        let mut parts = value.splitn(4, |&b| b == 0);
        let size = parts.next().ok_or(StoreError::CorruptMetadata)?;
        let mtime = parts.next().ok_or(StoreError::CorruptMetadata)?;
        let etag = parts.next().ok_or(StoreError::CorruptMetadata)?;
        let content_type = parts.next().ok_or(StoreError::CorruptMetadata)?;

        Ok(Self {
            size: parse_i64(size)?,
            mtime: parse_i64(mtime)?,
            etag: String::from_utf8_lossy(etag).into_owned(),
            content_type: String::from_utf8_lossy(content_type).into_owned(),
        })
    }
}

fn parse_i64(field: &[u8]) -> Result<i64, StoreError> {
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(StoreError::CorruptMetadata)
}

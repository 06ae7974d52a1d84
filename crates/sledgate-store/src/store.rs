//! The object store: bucket and object CRUD plus paginated listing over a
//! sled keyspace.

use std::ops::Bound;
use std::sync::Arc;
use std::time::Instant;

use sled::IVec;
use tracing::{debug, warn};

use sledgate_core::codec::{base64_decode, base64_encode};
use sledgate_core::digest::md5_hex;
use sledgate_core::timefmt::unix_now_seconds;

use crate::error::{StoreError, StoreResult};
use crate::keyspace::{
    BUCKET_SCAN_PREFIX, bucket_key, contains_nul, data_key, meta_key, meta_prefix,
};
use crate::meta::ObjectMeta;
use crate::observe::{KvObserver, KvOp};

/// Upper bound (and default) for `max_keys` in a listing request.
pub const MAX_LIST_KEYS: i64 = 1000;

/// An object emitted by a listing.
#[derive(Debug, Clone)]
pub struct ListedObject {
    /// The object key within its bucket.
    pub key: String,
    /// The object's stored metadata.
    pub meta: ObjectMeta,
}

/// Result of a `ListObjectsV2` scan.
#[derive(Debug, Clone, Default)]
pub struct ListResult {
    /// Matching objects in key order.
    pub objects: Vec<ListedObject>,
    /// Whether more matching keys exist past the last emitted one.
    pub is_truncated: bool,
    /// Opaque resume cursor, present exactly when truncated.
    pub next_continuation_token: Option<String>,
}

/// Object store over a shared sled handle.
///
/// The handle is cheaply cloneable; the gateway process owns the database
/// and the store holds a reference to it. All mutation goes through sled's
/// own internal synchronization, so `&self` methods are safe to call from
/// any number of sessions concurrently.
pub struct ObjectStore {
    db: sled::Db,
    observer: Option<Arc<dyn KvObserver>>,
    sync_writes: bool,
}

impl ObjectStore {
    /// Create a store without a metrics observer.
    #[must_use]
    pub fn new(db: sled::Db) -> Self {
        Self {
            db,
            observer: None,
            sync_writes: false,
        }
    }

    /// Create a store that reports every KV operation to `observer`.
    #[must_use]
    pub fn with_observer(db: sled::Db, observer: Arc<dyn KvObserver>) -> Self {
        Self {
            db,
            observer: Some(observer),
            sync_writes: false,
        }
    }

    /// Flush the tree after every mutation. Durability per write at the
    /// cost of write latency.
    #[must_use]
    pub fn synchronous(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    fn maybe_flush(&self) -> StoreResult<()> {
        if self.sync_writes {
            self.db.flush()?;
        }
        Ok(())
    }

    fn observe(&self, op: KvOp, ok: bool, bytes: usize, start: Instant) {
        if let Some(observer) = &self.observer {
            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
            observer.observe_kv(op, ok, bytes, latency_ms);
        }
    }

    /// Timed point read. A missing key is a successful operation.
    fn kv_get(&self, key: &[u8]) -> StoreResult<Option<IVec>> {
        let start = Instant::now();
        let res = self.db.get(key);
        let bytes = res
            .as_ref()
            .map(|v| v.as_ref().map_or(0, |val| val.len()))
            .unwrap_or(0);
        self.observe(KvOp::Get, res.is_ok(), bytes, start);
        Ok(res?)
    }

    /// Whether `bucket` exists.
    pub fn bucket_exists(&self, bucket: &str) -> StoreResult<bool> {
        if contains_nul(bucket) {
            return Err(StoreError::InvalidInput("bucket"));
        }
        Ok(self.kv_get(&bucket_key(bucket))?.is_some())
    }

    /// Create `bucket`. Succeeds without writing when it already exists.
    pub fn create_bucket(&self, bucket: &str) -> StoreResult<()> {
        if self.bucket_exists(bucket)? {
            return Ok(());
        }

        let start = Instant::now();
        let res = self.db.insert(bucket_key(bucket), Vec::new());
        self.observe(KvOp::Put, res.is_ok(), 0, start);
        res?;
        self.maybe_flush()?;
        debug!(bucket, "created bucket");
        Ok(())
    }

    /// All bucket names in lexicographic order.
    ///
    /// An iterator failure mid-scan ends the scan; names collected up to
    /// that point are still returned.
    pub fn list_buckets(&self) -> StoreResult<Vec<String>> {
        let start = Instant::now();
        let mut out = Vec::new();
        let mut iter_ok = true;
        for item in self.db.range(BUCKET_SCAN_PREFIX.to_vec()..) {
            let (key, _) = match item {
                Ok(kv) => kv,
                Err(e) => {
                    warn!(error = %e, "bucket scan failed, returning partial results");
                    iter_ok = false;
                    break;
                }
            };
            if !key.starts_with(BUCKET_SCAN_PREFIX) {
                break;
            }
            out.push(String::from_utf8_lossy(&key[BUCKET_SCAN_PREFIX.len()..]).into_owned());
        }
        self.observe(KvOp::Iter, iter_ok, 0, start);
        Ok(out)
    }

    /// Delete `bucket`. Fails with [`StoreError::BucketNotEmpty`] while any
    /// object remains under it; the marker alone is removed (no cascade).
    pub fn delete_bucket(&self, bucket: &str) -> StoreResult<()> {
        if !self.bucket_exists(bucket)? {
            return Err(StoreError::NoSuchBucket);
        }

        let mp = meta_prefix(bucket);
        if let Some(item) = self.db.range(mp.clone()..).next() {
            let (key, _) = item?;
            if key.starts_with(mp.as_slice()) {
                return Err(StoreError::BucketNotEmpty);
            }
        }

        let start = Instant::now();
        let res = self.db.remove(bucket_key(bucket));
        self.observe(KvOp::Delete, res.is_ok(), 0, start);
        res?;
        self.maybe_flush()?;
        debug!(bucket, "deleted bucket");
        Ok(())
    }

    /// Write an object, overwriting any previous version.
    ///
    /// Metadata and data land in one atomic batch, so concurrent readers
    /// see either the old pair or the new pair, never a mix.
    pub fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> StoreResult<ObjectMeta> {
        if contains_nul(bucket) || contains_nul(key) {
            return Err(StoreError::InvalidInput("bucket/key"));
        }
        if !self.bucket_exists(bucket)? {
            return Err(StoreError::NoSuchBucket);
        }

        let meta = ObjectMeta {
            size: data.len() as i64,
            mtime: unix_now_seconds(),
            etag: md5_hex(data),
            content_type: if content_type.is_empty() {
                "application/octet-stream".to_owned()
            } else {
                content_type.to_owned()
            },
        };

        let mut batch = sled::Batch::default();
        batch.insert(data_key(bucket, key), data);
        batch.insert(meta_key(bucket, key), meta.encode());

        let start = Instant::now();
        let res = self.db.apply_batch(batch);
        self.observe(KvOp::Write, res.is_ok(), data.len(), start);
        res?;
        self.maybe_flush()?;

        debug!(bucket, key, size = meta.size, etag = %meta.etag, "stored object");
        Ok(meta)
    }

    /// Fetch an object's metadata.
    pub fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectMeta> {
        if contains_nul(bucket) || contains_nul(key) {
            return Err(StoreError::InvalidInput("bucket/key"));
        }
        if !self.bucket_exists(bucket)? {
            return Err(StoreError::NoSuchBucket);
        }

        let value = self
            .kv_get(&meta_key(bucket, key))?
            .ok_or(StoreError::NoSuchKey)?;
        ObjectMeta::decode(&value)
    }

    /// Fetch an object's bytes and metadata.
    ///
    /// Two point reads: metadata first, then data. A delete racing between
    /// them surfaces as [`StoreError::NoSuchKey`] on the second read, which
    /// is indistinguishable from the delete having happened first.
    pub fn get_object(&self, bucket: &str, key: &str) -> StoreResult<(Vec<u8>, ObjectMeta)> {
        let meta = self.head_object(bucket, key)?;
        let data = self
            .kv_get(&data_key(bucket, key))?
            .ok_or(StoreError::NoSuchKey)?;
        Ok((data.to_vec(), meta))
    }

    /// Delete an object. Deleting an absent key succeeds; only a missing
    /// bucket is an error.
    pub fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        if contains_nul(bucket) || contains_nul(key) {
            return Err(StoreError::InvalidInput("bucket/key"));
        }
        if !self.bucket_exists(bucket)? {
            return Err(StoreError::NoSuchBucket);
        }

        let mut batch = sled::Batch::default();
        batch.remove(meta_key(bucket, key));
        batch.remove(data_key(bucket, key));

        let start = Instant::now();
        let res = self.db.apply_batch(batch);
        self.observe(KvOp::Write, res.is_ok(), 0, start);
        res?;
        self.maybe_flush()?;
        Ok(())
    }

    /// List objects under `prefix`, resuming from `continuation_token` when
    /// one is supplied.
    ///
    /// `max_keys` is clamped into `[1, 1000]`; non-positive values mean the
    /// default of 1000. The continuation token is the base64 of the last
    /// emitted metadata key, so resuming seeks straight to it and steps one
    /// past. An iterator failure mid-scan ends the scan; entries collected
    /// up to that point are still returned.
    pub fn list_objects_v2(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: i64,
        continuation_token: &str,
    ) -> StoreResult<ListResult> {
        if contains_nul(bucket) || contains_nul(prefix) || contains_nul(continuation_token) {
            return Err(StoreError::InvalidInput("bucket/prefix/token"));
        }
        if !self.bucket_exists(bucket)? {
            return Err(StoreError::NoSuchBucket);
        }

        let max_keys = if max_keys <= 0 {
            MAX_LIST_KEYS
        } else {
            max_keys.min(MAX_LIST_KEYS)
        };

        let mp = meta_prefix(bucket);
        let resuming = !continuation_token.is_empty();
        let seek_key = if resuming {
            base64_decode(continuation_token)
                .ok_or(StoreError::InvalidInput("continuation-token"))?
        } else {
            let mut k = mp.clone();
            k.extend_from_slice(prefix.as_bytes());
            k
        };

        let start = Instant::now();
        let mut result = ListResult::default();
        let mut last_meta_key: Vec<u8> = Vec::new();
        let mut first = true;
        let mut count: i64 = 0;
        let mut iter_ok = true;

        for item in self.db.range(seek_key.clone()..) {
            let (key, value) = match item {
                Ok(kv) => kv,
                Err(e) => {
                    warn!(bucket, error = %e, "listing scan failed, returning partial results");
                    iter_ok = false;
                    break;
                }
            };

            // A token points at the last emitted key; when the seek lands
            // exactly on it, resume one past it.
            if first {
                first = false;
                if resuming && key.as_ref() == seek_key.as_slice() {
                    continue;
                }
            }

            if !key.starts_with(mp.as_slice()) {
                break;
            }
            let obj_key = &key[mp.len()..];
            if !prefix.is_empty() && !obj_key.starts_with(prefix.as_bytes()) {
                // The seek started at mp+prefix, so the first mismatch ends
                // the matching run.
                break;
            }

            let Ok(meta) = ObjectMeta::decode(&value) else {
                debug!(bucket, "skipping undecodable metadata entry");
                continue;
            };

            result.objects.push(ListedObject {
                key: String::from_utf8_lossy(obj_key).into_owned(),
                meta,
            });
            last_meta_key = key.to_vec();

            count += 1;
            if count >= max_keys {
                if self.has_next_match(&last_meta_key, &mp, prefix) {
                    result.is_truncated = true;
                    result.next_continuation_token = Some(base64_encode(&last_meta_key));
                }
                break;
            }
        }

        self.observe(KvOp::Iter, iter_ok, 0, start);
        Ok(result)
    }

    /// Truncation probe: is there another key after `last_meta_key` that
    /// still belongs to this bucket and prefix?
    fn has_next_match(&self, last_meta_key: &[u8], mp: &[u8], prefix: &str) -> bool {
        let probe = self
            .db
            .range::<&[u8], _>((Bound::Excluded(last_meta_key), Bound::Unbounded))
            .next();
        match probe {
            Some(Ok((key, _))) => {
                key.starts_with(mp)
                    && (prefix.is_empty() || key[mp.len()..].starts_with(prefix.as_bytes()))
            }
            _ => false,
        }
    }
}

//! The prefix index: aligned token-prefix hashes to object entries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use xxhash_rust::xxh64::xxh64;

use crate::error::CacheError;
use crate::storage::CacheStorage;

/// Separator between tokens before hashing, so `["ab","c"]` and
/// `["a","bc"]` hash differently.
const TOKEN_SEPARATOR: u8 = 0x1f;

/// One indexed aligned prefix.
#[derive(Debug, Clone)]
pub struct PrefixEntry {
    /// Content-addressed id of the backing object.
    pub obj_id: String,
    /// Bytes of the object usable at this prefix length.
    pub usable_len_bytes: usize,
    /// Value of the version clock when this entry was written.
    pub version: u64,
    /// Tag of the writer that stored the object.
    pub owner_id: String,
    /// Caller-assigned priority, reserved for eviction policy.
    pub priority: i32,
}

/// Per-object bookkeeping.
#[derive(Debug, Clone)]
pub struct ObjectState {
    /// Full size of the stored blob.
    pub total_bytes: usize,
    /// When the object was last stored or loaded through the index.
    pub last_access: Instant,
    /// Reads currently in flight against this object.
    pub inflight_reads: u32,
}

/// A successful lookup: the longest indexed prefix and its usable bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupHit {
    /// Object to fetch.
    pub obj_id: String,
    /// How many leading bytes of it are usable.
    pub usable_len_bytes: usize,
    /// The matched prefix length, in tokens.
    pub prefix_tokens: usize,
}

/// Maps hashed aligned token prefixes to stored objects.
///
/// Writes go through `&mut self`; the core contract is single-writer.
/// Wrap the index in your own exclusion if you need concurrent writers.
pub struct PrefixIndex {
    block_size: usize,
    bytes_per_token: usize,
    version_clock: u64,
    storage: Arc<dyn CacheStorage>,
    prefix_map: HashMap<u64, PrefixEntry>,
    objects: HashMap<String, ObjectState>,
}

impl PrefixIndex {
    /// Create an index over `storage`.
    ///
    /// `block_size` is the token-count granularity of indexing;
    /// `bytes_per_token` of 0 selects proportional sizing.
    ///
    /// # Panics
    ///
    /// Panics when `block_size` is zero; an unaligned index is meaningless.
    #[must_use]
    pub fn new(block_size: usize, bytes_per_token: usize, storage: Arc<dyn CacheStorage>) -> Self {
        assert!(block_size > 0, "block_size must be positive");
        Self {
            block_size,
            bytes_per_token,
            version_clock: 0,
            storage,
            prefix_map: HashMap::new(),
            objects: HashMap::new(),
        }
    }

    /// Upload `data` and index every aligned prefix of `tokens`.
    ///
    /// Returns the content-addressed object id. Sequences shorter than one
    /// block are stored but not indexed. Colliding prefix hashes are
    /// overwritten.
    pub async fn store(
        &mut self,
        tokens: &[String],
        data: &[u8],
        owner_id: &str,
        priority: i32,
    ) -> Result<String, CacheError> {
        self.store_with(tokens, data, owner_id, priority, false).await
    }

    /// Like [`store`](Self::store), but with `skip_put` the bytes are
    /// assumed already present in storage and only the index is updated.
    pub async fn store_with(
        &mut self,
        tokens: &[String],
        data: &[u8],
        owner_id: &str,
        priority: i32,
        skip_put: bool,
    ) -> Result<String, CacheError> {
        let obj_id = object_id(data);
        if !skip_put {
            self.storage.put(&obj_id, data).await?;
        }

        self.version_clock += 1;
        self.objects.insert(
            obj_id.clone(),
            ObjectState {
                total_bytes: data.len(),
                last_access: Instant::now(),
                inflight_reads: 0,
            },
        );

        if tokens.len() < self.block_size {
            return Ok(obj_id);
        }

        let mut prefix_len = self.block_size;
        while prefix_len <= tokens.len() {
            let hash = hash_tokens(tokens, prefix_len);
            let usable = usable_bytes(
                self.bytes_per_token,
                prefix_len,
                tokens.len(),
                data.len(),
            );
            self.prefix_map.insert(
                hash,
                PrefixEntry {
                    obj_id: obj_id.clone(),
                    usable_len_bytes: usable,
                    version: self.version_clock,
                    owner_id: owner_id.to_owned(),
                    priority,
                },
            );
            prefix_len += self.block_size;
        }

        debug!(
            obj_id,
            tokens = tokens.len(),
            bytes = data.len(),
            "indexed object"
        );
        Ok(obj_id)
    }

    /// Find the longest indexed aligned prefix of `tokens`.
    ///
    /// The walk goes block by block upward and stops at the first missing
    /// hash. `max_len_tokens` of 0 means no bound.
    #[must_use]
    pub fn lookup(&self, tokens: &[String], max_len_tokens: usize) -> Option<LookupHit> {
        if tokens.len() < self.block_size {
            return None;
        }

        let max_len = if max_len_tokens == 0 || max_len_tokens > tokens.len() {
            tokens.len()
        } else {
            max_len_tokens
        };

        let mut best: Option<(&PrefixEntry, usize)> = None;
        let mut prefix_len = self.block_size;
        while prefix_len <= max_len {
            let hash = hash_tokens(tokens, prefix_len);
            match self.prefix_map.get(&hash) {
                Some(entry) => best = Some((entry, prefix_len)),
                None => break,
            }
            prefix_len += self.block_size;
        }

        best.map(|(entry, prefix_tokens)| LookupHit {
            obj_id: entry.obj_id.clone(),
            usable_len_bytes: entry.usable_len_bytes,
            prefix_tokens,
        })
    }

    /// Stream back the usable bytes of a previously looked-up object.
    pub async fn load(
        &self,
        obj_id: &str,
        usable_len_bytes: usize,
    ) -> Result<Vec<u8>, CacheError> {
        self.storage.get_range(obj_id, usable_len_bytes).await
    }

    /// Number of indexed prefixes.
    #[must_use]
    pub fn prefix_count(&self) -> usize {
        self.prefix_map.len()
    }

    /// Number of objects this index has stored.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// The configured token-count granularity.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

/// Bytes of an object usable for a `prefix_len`-token prefix.
///
/// Fixed mode multiplies and caps at the object size. Proportional mode
/// floors `prefix_len/total_tokens` of the size into `[1, total_bytes]`,
/// returning 0 only for an empty object or empty token sequence.
fn usable_bytes(
    bytes_per_token: usize,
    prefix_len: usize,
    total_tokens: usize,
    total_bytes: usize,
) -> usize {
    if bytes_per_token > 0 {
        return (prefix_len * bytes_per_token).min(total_bytes);
    }

    if total_tokens == 0 || total_bytes == 0 {
        return 0;
    }

    let frac = prefix_len as f64 / total_tokens as f64;
    let bytes = (frac * total_bytes as f64) as usize;
    bytes.clamp(1, total_bytes)
}

/// Stable 64-bit hash of the first `count` tokens, unit-separated.
fn hash_tokens(tokens: &[String], count: usize) -> u64 {
    let mut input = Vec::with_capacity(count * 8);
    for (i, token) in tokens[..count].iter().enumerate() {
        if i > 0 {
            input.push(TOKEN_SEPARATOR);
        }
        input.extend_from_slice(token.as_bytes());
    }
    xxh64(&input, 0)
}

/// Content-addressed object id: 16 lowercase hex chars.
fn object_id(data: &[u8]) -> String {
    format!("{:016x}", xxh64(data, 0))
}

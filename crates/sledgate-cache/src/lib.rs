//! Prefix-aware content-addressed cache index.
//!
//! Maps token sequences to previously uploaded byte blobs: storing an
//! object indexes every `block_size`-aligned prefix of its token sequence,
//! and a later lookup recovers the longest indexed prefix together with how
//! many of the object's bytes are usable for it.
//!
//! The index itself is in-memory; the bytes live in a storage backend
//! behind the [`CacheStorage`] capability - either [`MemoryStorage`] or a
//! running S3 gateway via [`S3Storage`].
//!
//! - [`index`] - the [`PrefixIndex`] and its sizing rules
//! - [`storage`] - the capability trait and the in-memory backend
//! - [`s3`] - the gateway-backed storage client
//! - [`error`] - failure taxonomy

pub mod error;
pub mod index;
pub mod s3;
pub mod storage;

pub use error::CacheError;
pub use index::{LookupHit, PrefixIndex};
pub use s3::{S3Config, S3Storage};
pub use storage::{CacheStorage, MemoryStorage};
